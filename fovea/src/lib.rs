//! FOVEA - Forced-choice Optotype Vision Evaluation & Adaptation
//!
//! A quick-CSF (Lesmes et al. 2010) adaptive engine for measuring a human
//! observer's contrast sensitivity function. Each trial, the engine picks
//! the spatial-frequency / contrast pair expected to squeeze the most
//! information out of the observer, a stimulus mode renders it through the
//! `stimulus` crate, the observer's keypress is scored, and the posterior
//! over a 4-parameter CSF model is updated. After a fixed trial budget the
//! run is summarized as AULCSF, a rank bucket, predicted Snellen acuity,
//! and per-landmark pass/fail.
//!
//! # Quick Start
//!
//! ```text
//! use fovea::{compute_result, Gabor4Afc, QcsfConfig, QcsfEngine,
//!             ResultOptions, StimulusMode};
//! use stimulus::{calibration::Calibration, frame::Frame};
//!
//! let cal = Calibration::new(5.0, 1000.0, 128, false)?;
//! let mut mode = Gabor4Afc::new(seed);
//! mode.prepare()?;
//! let mut engine = QcsfEngine::new(QcsfConfig::for_mode(mode.num_afc(), mode.slope()))?;
//!
//! for _ in 0..engine.config().max_trials {
//!     let choice = engine.select_stimulus();
//!     let mut frame = Frame::new(&mut rgba_buffer, width, height, cal.mirror)?;
//!     mode.render(&mut frame, &choice, &cal)?;
//!     let response = wait_for_keypress();            // embedder-supplied
//!     engine.update(choice.stim_index, mode.check(&response))?;
//! }
//!
//! let result = compute_result(&engine, &ResultOptions::default());
//! println!("{} ({})", result.rank.as_str(), result.aulcsf);
//! ```
//!
//! # Per-trial data flow
//!
//! ```text
//!   engine.select_stimulus()
//!        |  (freq, contrast, index)
//!   mode.render(frame, choice, calibration)   -> pixels + hidden label
//!        |                                       (external display)
//!   mode.check(observer response)             -> correct: bool
//!        |
//!   engine.update(index, correct)             -> posterior, history
//! ```
//!
//! The engine is a single-threaded pull API: nothing blocks, nothing runs
//! between calls, and the embedder owns the loop, the response deadline,
//! and the trial budget. Construction precomputes everything expensive
//! (grids, the likelihood matrix, scratch buffers); `select_stimulus` and
//! `update` never allocate.
//!
//! # Key Types
//!
//! - [`QcsfEngine`] - grids, posterior, stimulus selection, update
//! - [`QcsfConfig`] - construction parameters with stock qCSF defaults
//! - [`StimulusMode`] - seam between engine and renderers
//! - [`Gabor4Afc`] / [`GaborYesNo`] / [`TumblingE`] / [`Sloan`] - modes
//! - [`TestResult`] - everything reported for a completed run

pub mod config;
pub mod csf;
pub mod engine;
pub mod error;
pub mod mode;
pub mod result;

pub use crate::config::QcsfConfig;
pub use crate::csf::{CsfParams, CsfSample};
pub use crate::engine::{
    EngineWarning, QcsfEngine, Stimulus, StimulusChoice, TrialRecord,
};
pub use crate::error::QcsfError;
pub use crate::mode::{Gabor4Afc, GaborYesNo, Sloan, StimulusMode, TumblingE};
pub use crate::result::{
    compute_result, LandmarkResult, Rank, ResultOptions, TestResult,
};
