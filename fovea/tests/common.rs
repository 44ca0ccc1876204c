//! Common utilities for fovea integration tests

use fovea::{csf, CsfParams, QcsfEngine, Stimulus};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Observer that answers from the engine's own likelihood row for a chosen
/// grid point. Used for grid-recovery tests where the truth must lie
/// exactly on the parameter grid.
pub struct OracleObserver {
    pub true_index: usize,
    rng: ChaCha8Rng,
}

impl OracleObserver {
    pub fn new(true_index: usize, seed: u64) -> Self {
        Self {
            true_index,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn respond(&mut self, engine: &QcsfEngine, stim_index: usize) -> bool {
        let p = engine.likelihood()[[self.true_index, stim_index]];
        self.rng.gen_bool(p)
    }
}

/// Observer simulated from CSF parameters and psychometrics, independent of
/// any engine grid.
pub struct ModelObserver {
    pub params: CsfParams,
    pub slope: f64,
    pub guess: f64,
    pub lapse: f64,
    rng: ChaCha8Rng,
}

impl ModelObserver {
    /// 4AFC observer with the stock grating psychometrics.
    pub fn new(params: CsfParams, seed: u64) -> Self {
        Self::with_psychometrics(params, 3.5, 0.25, 0.04, seed)
    }

    pub fn with_psychometrics(
        params: CsfParams,
        slope: f64,
        guess: f64,
        lapse: f64,
        seed: u64,
    ) -> Self {
        Self {
            params,
            slope,
            guess,
            lapse,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Probability of a correct response to `stim`.
    pub fn success_probability(&self, stim: &Stimulus) -> f64 {
        let x = csf::log_sensitivity(stim.freq, &self.params) + stim.log_contrast;
        let psi = 1.0 / (1.0 + (-self.slope * x).exp());
        (self.guess + (1.0 - self.guess - self.lapse) * psi).clamp(0.0, 1.0)
    }

    /// Draw one response.
    pub fn respond(&mut self, stim: &Stimulus) -> bool {
        let p = self.success_probability(stim);
        self.rng.gen_bool(p)
    }
}

/// Drive `n` trials of an engine against a model observer.
pub fn run_trials(engine: &mut QcsfEngine, observer: &mut ModelObserver, n: u32) {
    for _ in 0..n {
        let choice = engine.select_stimulus();
        let stim = engine.stimuli()[choice.stim_index];
        let correct = observer.respond(&stim);
        engine
            .update(choice.stim_index, correct)
            .expect("index from select_stimulus is always in range");
    }
}
