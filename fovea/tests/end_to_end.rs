//! Full sessions: engine + mode + renderer + result derivation, driven the
//! way an embedder would drive them.

mod common;

use common::ModelObserver;
use fovea::{
    compute_result, CsfParams, Gabor4Afc, GaborYesNo, QcsfConfig, QcsfEngine, Rank,
    ResultOptions, Sloan, StimulusMode, TumblingE,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stimulus::calibration::Calibration;
use stimulus::frame::Frame;

const WIDTH: usize = 256;
const HEIGHT: usize = 256;

fn test_calibration() -> Calibration {
    Calibration::new(5.0, 1000.0, 128, false).unwrap()
}

/// Drive a full session: the mode renders each trial into the RGBA buffer,
/// a model observer decides correctness, and the response string handed to
/// `check` is either the ground truth or a deliberately wrong label.
fn run_session(
    mode: &mut dyn StimulusMode,
    observer: &mut ModelObserver,
    trials: u32,
    seed: u64,
) -> QcsfEngine {
    let cal = test_calibration();
    mode.prepare().unwrap();
    let config = QcsfConfig {
        seed,
        ..QcsfConfig::for_mode(mode.num_afc(), mode.slope())
    };
    let mut engine = QcsfEngine::new(config).unwrap();
    let mut buffer = vec![0u8; WIDTH * HEIGHT * 4];
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);

    for _ in 0..trials {
        let choice = engine.select_stimulus();
        let mut frame = Frame::new(&mut buffer, WIDTH, HEIGHT, cal.mirror).unwrap();
        let truth = mode.render(&mut frame, &choice, &cal).unwrap();
        assert!(mode.labels().contains(&truth));

        let stim = engine.stimuli()[choice.stim_index];
        let response = if observer.respond(&stim) {
            truth
        } else {
            let wrong: Vec<&str> = mode.labels().iter().copied().filter(|&l| l != truth).collect();
            wrong[rng.gen_range(0..wrong.len())]
        };
        let correct = mode.check(response);
        engine.update(choice.stim_index, correct).unwrap();

        let total: f64 = engine.posterior().iter().sum();
        assert!((total - 1.0).abs() <= 1e-9);
    }
    engine
}

fn healthy_observer(guess: f64, slope: f64, seed: u64) -> ModelObserver {
    ModelObserver::with_psychometrics(
        CsfParams {
            gain: 2.0,
            peak_freq: 4.0,
            bandwidth: 2.5,
            truncation: 1.2,
        },
        slope,
        guess,
        0.04,
        seed,
    )
}

#[test]
fn test_tumbling_e_session_produces_full_report() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut mode = TumblingE::new(21);
    let mut observer = healthy_observer(0.25, 3.5, 22);
    let engine = run_session(&mut mode, &mut observer, 25, 23);

    assert_eq!(engine.trial_count(), 25);
    assert_eq!(engine.history().len(), 25);

    let result = compute_result(&engine, &ResultOptions::default());
    assert_ne!(result.rank, Rank::Error);
    assert!(result.aulcsf >= 0.0);
    assert!(result.curve.len() >= 100);
    assert_eq!(result.landmarks.len(), 5);
    assert_eq!(result.history.len(), 25);
    let cutoff = result.cutoff_freq.expect("healthy run has a cutoff");
    assert!(cutoff > 0.0 && cutoff <= 60.0);
    let snellen = result.snellen.expect("healthy run predicts acuity");
    assert!(snellen.starts_with("20/"), "snellen {snellen}");
}

#[test]
fn test_sloan_session_uses_letter_psychometrics() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut mode = Sloan::new(31);
    let mut observer = healthy_observer(0.1, 4.05, 32);
    let engine = run_session(&mut mode, &mut observer, 15, 33);

    assert_eq!(engine.config().num_afc, 10);
    assert!((engine.config().guess_rate() - 0.1).abs() < 1e-12);
    assert_eq!(engine.trial_count(), 15);
}

#[test]
fn test_gabor_4afc_session() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut mode = Gabor4Afc::new(41);
    let mut observer = healthy_observer(0.25, 3.5, 42);
    let engine = run_session(&mut mode, &mut observer, 20, 43);

    let result = compute_result(&engine, &ResultOptions::default());
    assert_ne!(result.rank, Rank::Error);
    assert!(result.aulcsf >= 0.0);
}

#[test]
fn test_gabor_yes_no_session_scores_none_as_incorrect() {
    let _ = env_logger::builder().is_test(true).try_init();

    let cal = test_calibration();
    let mut mode = GaborYesNo::new(51);
    mode.prepare().unwrap();
    let config = QcsfConfig {
        seed: 52,
        ..QcsfConfig::for_mode(mode.num_afc(), mode.slope())
    };
    assert!((config.guess_rate() - config.false_alarm_rate).abs() < 1e-12);
    let mut engine = QcsfEngine::new(config).unwrap();
    let mut buffer = vec![0u8; WIDTH * HEIGHT * 4];

    for trial in 0..15 {
        let choice = engine.select_stimulus();
        let mut frame = Frame::new(&mut buffer, WIDTH, HEIGHT, cal.mirror).unwrap();
        let truth = mode.render(&mut frame, &choice, &cal).unwrap();
        // Every third trial the observer claims to see nothing; a target
        // is always present, so that answer is always wrong.
        let response = if trial % 3 == 0 { "none" } else { truth };
        let correct = mode.check(response);
        assert_eq!(correct, trial % 3 != 0);
        engine.update(choice.stim_index, correct).unwrap();
    }
    assert_eq!(engine.trial_count(), 15);
}

#[test]
fn test_mirrored_calibration_renders_and_scores() {
    let _ = env_logger::builder().is_test(true).try_init();

    let cal = Calibration::new(5.0, 1000.0, 128, true).unwrap();
    let mut mode = TumblingE::new(61);
    mode.prepare().unwrap();
    let mut engine = QcsfEngine::new(QcsfConfig::for_mode(mode.num_afc(), mode.slope())).unwrap();
    let mut buffer = vec![0u8; WIDTH * HEIGHT * 4];

    let choice = engine.select_stimulus();
    let mut frame = Frame::new(&mut buffer, WIDTH, HEIGHT, cal.mirror).unwrap();
    let truth = mode.render(&mut frame, &choice, &cal).unwrap();
    // Mirroring is a frame-level pre-flip for mirrored viewing paths; the
    // ground truth label is unaffected.
    assert!(mode.check(truth));
    engine.update(choice.stim_index, true).unwrap();
}
