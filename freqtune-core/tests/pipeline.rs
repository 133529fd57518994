use freqtune_core::{
    acquire, AnalysisConfig, AnalysisError, Confidence, FrequencyEstimator, NoteMapper,
    ReadingStatus, SignalSimulator, SignalStatistics, SimulatedSource, Smoothing, Tuner,
    TunerConfig, Waveform,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn simulator(seed: u64) -> SignalSimulator {
    SignalSimulator::new(Default::default(), seed)
}

#[test]
fn sine_frequencies_are_recovered_within_one_percent() {
    init_logging();
    let estimator = FrequencyEstimator::default();
    let mut sim = simulator(42);

    for &(frequency, rate) in &[(110.0f32, 8_000u32), (440.0, 30_000), (1000.0, 40_000), (2000.0, 48_000)] {
        // 20 samples per period or more, at least 40 periods
        let len = (40.0 * rate as f32 / frequency) as usize;
        let buffer = sim.generate_buffer(Waveform::Sine, frequency, 0, len, rate).unwrap();
        let stats = SignalStatistics::compute(&buffer, Smoothing::None).unwrap();
        let analysis = estimator.analyze(&buffer, &stats).unwrap();

        let classic_error = (analysis.classic_frequency - frequency).abs() / frequency;
        let mean_error = (analysis.mean_period_frequency() - frequency).abs() / frequency;
        assert!(classic_error < 0.01, "{frequency} Hz: classic {}", analysis.classic_frequency);
        assert!(mean_error < 0.01, "{frequency} Hz: mean {}", analysis.mean_period_frequency());
        assert_eq!(analysis.confidence(), Confidence::Measured);
    }
}

#[test]
fn ten_periods_at_twenty_times_the_frequency_are_enough() {
    init_logging();
    let estimator = FrequencyEstimator::default();

    for &frequency in &[65.41f32, 100.0, 261.63, 440.0, 1046.5, 4000.0] {
        let rate = (20.0 * frequency).ceil() as u32;
        let len = (10.0 * rate as f64 / frequency as f64).ceil() as usize;
        for seed in 0..10 {
            let buffer = simulator(seed)
                .generate_buffer(Waveform::Sine, frequency, 0, len, rate)
                .unwrap();
            let stats = SignalStatistics::compute(&buffer, Smoothing::None).unwrap();
            let analysis = estimator.analyze(&buffer, &stats).unwrap();

            let classic_error = (analysis.classic_frequency - frequency).abs() / frequency;
            let mean_error = (analysis.mean_period_frequency() - frequency).abs() / frequency;
            assert!(
                classic_error < 0.01,
                "{frequency} Hz at {rate} Hz, seed {seed}: classic {}",
                analysis.classic_frequency
            );
            assert!(
                mean_error < 0.01,
                "{frequency} Hz at {rate} Hz, seed {seed}: mean {}",
                analysis.mean_period_frequency()
            );
        }
    }
}

#[test]
fn ramps_are_measured_like_sines() {
    init_logging();
    let estimator = FrequencyEstimator::default();
    let mut sim = simulator(9);

    for waveform in [Waveform::RisingRamp, Waveform::FallingRamp] {
        let buffer = sim.generate_buffer(waveform, 250.0, 0, 4000, 20_000).unwrap();
        let stats = SignalStatistics::compute(&buffer, Smoothing::None).unwrap();
        let analysis = estimator.analyze(&buffer, &stats).unwrap();
        assert!(
            (analysis.classic_frequency - 250.0).abs() < 2.5,
            "{waveform}: {}",
            analysis.classic_frequency
        );
    }
}

#[test]
fn moderate_noise_is_absorbed_by_the_hysteresis() {
    init_logging();
    let buffer = simulator(5)
        .generate_buffer(Waveform::Sine, 330.0, 200, 6000, 30_000)
        .unwrap();
    let reading = Tuner::default().process(&buffer);
    assert!(reading.valid);
    assert_eq!(reading.note_name.as_deref(), Some("E4"));
    assert!((reading.frequency - 330.0).abs() < 3.3, "{}", reading.frequency);
}

#[test]
fn smoothing_keeps_low_tones_measurable() {
    init_logging();
    let config = TunerConfig {
        analysis: AnalysisConfig {
            smoothing: Smoothing::MovingAverage { window: 5 },
            ..Default::default()
        },
        ..Default::default()
    };
    let buffer = simulator(6)
        .generate_buffer(Waveform::Sine, 98.0, 300, 8000, 8_000)
        .unwrap();
    let reading = Tuner::new(config).process(&buffer);
    assert!(reading.valid);
    assert_eq!(reading.note_name.as_deref(), Some("G2"));
}

#[test]
fn repeated_analysis_is_identical() {
    let buffer = simulator(1)
        .generate_buffer(Waveform::Sine, 523.0, 300, 4096, 30_000)
        .unwrap();
    let tuner = Tuner::default();
    assert_eq!(tuner.analyze(&buffer).unwrap(), tuner.analyze(&buffer).unwrap());
    assert_eq!(tuner.process(&buffer), tuner.process(&buffer));
}

#[test]
fn silence_is_no_tone() {
    let buffer = freqtune_core::SampleBuffer::new(vec![2048; 2048], 30_000);
    let stats = SignalStatistics::compute(&buffer, Smoothing::None).unwrap();
    let err = FrequencyEstimator::default().analyze(&buffer, &stats).unwrap_err();
    assert!(matches!(err, AnalysisError::ConstantSignal { span: 0 }));
    assert!(err.is_no_tone());
    assert_eq!(Tuner::default().process(&buffer).status, ReadingStatus::Invalid);
}

#[test]
fn statistics_are_ordered_for_every_waveform() {
    let mut sim = simulator(77);
    for waveform in [Waveform::Sine, Waveform::RisingRamp, Waveform::FallingRamp] {
        for smoothing in [Smoothing::None, Smoothing::MovingAverage { window: 5 }] {
            let buffer = sim.generate_buffer(waveform, 700.0, 600, 3000, 30_000).unwrap();
            let stats = SignalStatistics::compute(&buffer, smoothing).unwrap();
            assert!(stats.min <= stats.mean && stats.mean <= stats.max, "{stats:?}");
        }
    }
}

#[test]
fn simulated_source_feeds_the_tuner() {
    init_logging();
    let mut source = SimulatedSource::new(simulator(3), Waveform::Sine, 440.0, 100, 30_000);
    let tuner = Tuner::default();
    for _ in 0..5 {
        let buffer = acquire(&mut source, 4096).unwrap();
        let reading = tuner.process(&buffer);
        assert_eq!(reading.note_name.as_deref(), Some("A4"));
        assert!(reading.cents.abs() <= 10, "{} cents", reading.cents);
    }
}

#[test]
fn measured_frequency_maps_back_to_its_grid_note() {
    let mapper = NoteMapper::default();
    let estimator = FrequencyEstimator::default();
    let mut sim = simulator(12);
    // C3, A3, E5
    for (frequency, name) in [(130.81f32, "C3"), (220.0, "A3"), (659.26, "E5")] {
        let buffer = sim.generate_buffer(Waveform::Sine, frequency, 0, 8000, 40_000).unwrap();
        let stats = SignalStatistics::compute(&buffer, Smoothing::None).unwrap();
        let analysis = estimator.analyze(&buffer, &stats).unwrap();
        let note = mapper.nearest_note(analysis.classic_frequency).unwrap();
        assert_eq!(note.name, name);
        assert!(note.cents.abs() <= 5, "{name}: {} cents", note.cents);
    }
}
