//! # Musical Note Mapping
//!
//! Maps a frequency to the nearest equal-tempered note between the low C at
//! 65.41 Hz and the C at 8372.02 Hz, and reports the deviation in cents.
//!
//! The span is split into seven octave ranges, each starting at a C. Inside
//! a range the thirteen candidates C, C#, ... B, C' are generated from the
//! range root by the semitone ratio 2^(1/12). Candidate 12 of one range is the
//! same pitch as candidate 0 of the next range and carries the same label.
//!
//! ## Naming conventions
//! - [`NoteNaming::Scientific`]: `C2` ... `B8`, `C9` (A4 = 440 Hz)
//! - [`NoteNaming::Helmholtz`]: German names, `C` ... `H`, `c` ... `h`,
//!   `c1` ... `h5`, `c6` (a1 = 440 Hz)

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::NoteError;

/// Start frequency of each octave range, in Hz.
pub const OCTAVE_STARTS: [f64; 7] = [
    65.406_391_325_140_1,
    130.812_782_650_287,
    261.625_565_300_588,
    523.251_130_601_197,
    1046.502_261_202_4,
    2093.004_522_404_79,
    4186.009_045,
];

/// Number of octave ranges.
pub const RANGE_COUNT: usize = OCTAVE_STARTS.len();

/// Candidates per range: twelve semitones plus the next root.
pub const CANDIDATES_PER_RANGE: usize = 13;

/// Frequency ratio of one equal-tempered semitone, 2^(1/12).
pub const SEMITONE_RATIO: f32 = 1.059_463_1;

/// Frequency ratio of half a semitone (50 cents), 2^(1/24).
pub const HALF_SEMITONE_RATIO: f32 = 1.029_302_2;

/// Distances below this many Hz count as exactly in tune.
/// One cent at the lowest C is about 0.0389 Hz.
pub const CENT_EPSILON_HZ: f32 = 0.03;

const SCIENTIFIC_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const HELMHOLTZ_NAMES: [&str; 12] = [
    "c", "cis", "d", "dis", "e", "f", "fis", "g", "gis", "a", "b", "h",
];

/// Candidate frequencies of every range, computed once.
static REFERENCE_GRID: Lazy<[[f32; CANDIDATES_PER_RANGE]; RANGE_COUNT]> = Lazy::new(|| {
    let mut grid = [[0.0; CANDIDATES_PER_RANGE]; RANGE_COUNT];
    for (row, &start) in grid.iter_mut().zip(OCTAVE_STARTS.iter()) {
        for (k, cell) in row.iter_mut().enumerate() {
            *cell = (start * 2.0_f64.powf(k as f64 / 12.0)) as f32;
        }
    }
    grid
});

/// Highest accepted frequency: 50 cents above the top C.
static UPPER_LIMIT: Lazy<f32> =
    Lazy::new(|| REFERENCE_GRID[RANGE_COUNT - 1][CANDIDATES_PER_RANGE - 1] * HALF_SEMITONE_RATIO);

/// How note labels are spelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteNaming {
    /// English names with octave numbers, middle C = C4.
    #[default]
    Scientific,
    /// German names (h for B, b for B flat, -is for sharps), middle C = c1.
    Helmholtz,
}

impl NoteNaming {
    /// Label of `semitone` (0..=12) in octave range `range` (0..=6).
    pub fn label(self, range: usize, semitone: usize) -> String {
        // Candidate 12 is the root of the next range.
        let (octave, step) = if semitone >= 12 {
            (range + 1, 0)
        } else {
            (range, semitone)
        };

        match self {
            NoteNaming::Scientific => format!("{}{}", SCIENTIFIC_NAMES[step], octave + 2),
            NoteNaming::Helmholtz => {
                let name = HELMHOLTZ_NAMES[step];
                match octave {
                    0 => capitalize(name),
                    1 => name.to_string(),
                    o => format!("{}{}", name, o - 1),
                }
            }
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// The note nearest to a measured frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMatch {
    /// Label in the mapper's naming convention, e.g. `A4` or `a1`.
    pub name: String,
    /// Octave range the frequency fell into (0..=6).
    pub range: usize,
    /// Index of the matched candidate inside the range (0..=12).
    pub semitone: usize,
    /// Equal-tempered frequency of the matched note, in Hz.
    pub reference_frequency: f32,
    /// Signed deviation from the matched note (positive = sharp).
    pub cents: i32,
}

/// Nearest-note lookup over the fixed seven-octave table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteMapper {
    naming: NoteNaming,
}

impl NoteMapper {
    pub fn new(naming: NoteNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> NoteNaming {
        self.naming
    }

    /// Equal-tempered frequency of a grid point, if it exists.
    pub fn reference_frequency(range: usize, semitone: usize) -> Option<f32> {
        REFERENCE_GRID.get(range)?.get(semitone).copied()
    }

    /// Finds the octave range containing `freq`.
    ///
    /// # Returns
    /// * `Ok(range)` - index into [`OCTAVE_STARTS`]
    /// * `Err(BelowRange)` - below the lowest C
    /// * `Err(AboveRange)` - more than 50 cents above the top C
    /// * `Err(NotFinite)` - NaN or infinite input
    pub fn find_range(&self, freq: f32) -> Result<usize, NoteError> {
        if !freq.is_finite() {
            return Err(NoteError::NotFinite);
        }
        if freq < REFERENCE_GRID[0][0] {
            return Err(NoteError::BelowRange(freq));
        }
        if freq > *UPPER_LIMIT {
            return Err(NoteError::AboveRange(freq));
        }
        Ok(REFERENCE_GRID
            .iter()
            .rposition(|row| row[0] <= freq)
            .unwrap_or(0))
    }

    /// Finds the nearest note to `freq` and its deviation in cents.
    ///
    /// The deviation is `distance / one_cent` rounded half away from zero,
    /// where one cent is approximated linearly as
    /// `(SEMITONE_RATIO - 1) * reference / 100`.
    pub fn nearest_note(&self, freq: f32) -> Result<NoteMatch, NoteError> {
        let range = self.find_range(freq)?;
        let candidates = &REFERENCE_GRID[range];

        let mut semitone = 0;
        let mut distance = freq - candidates[0];
        for (k, &candidate) in candidates.iter().enumerate().skip(1) {
            let d = freq - candidate;
            if d.abs() < distance.abs() {
                semitone = k;
                distance = d;
            }
        }

        let reference_frequency = candidates[semitone];
        Ok(NoteMatch {
            name: self.naming.label(range, semitone),
            range,
            semitone,
            reference_frequency,
            cents: cents_from_distance(distance, reference_frequency),
        })
    }

    /// Same lookup, returning the signed deviation alongside the match.
    pub fn nearest_note_with_cents(&self, freq: f32) -> Result<(NoteMatch, i32), NoteError> {
        let note = self.nearest_note(freq)?;
        let cents = note.cents;
        Ok((note, cents))
    }
}

fn cents_from_distance(distance: f32, reference: f32) -> i32 {
    if distance.abs() < CENT_EPSILON_HZ {
        return 0;
    }
    let one_cent = (SEMITONE_RATIO - 1.0) * reference / 100.0;
    (distance / one_cent).round() as i32
}
