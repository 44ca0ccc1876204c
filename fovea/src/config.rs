//! Engine configuration and the stock grids.

use serde::{Deserialize, Serialize};
use stimulus::algo::numeric::{linspace, logspace10};

/// Configuration for one adaptive CSF run.
///
/// `Default` carries the stock qCSF setup: a 10x10x5x5 parameter grid and
/// a 12-frequency x 30-contrast stimulus grid. Grids are plain value
/// lists so an embedder can substitute coarser or denser ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcsfConfig {
    /// Response alternatives: 1 (yes/no detection), 4, or 10.
    pub num_afc: u32,
    /// Psychometric slope of the logistic link.
    pub psychometric_slope: f64,
    /// Lapse rate: wrong answers on suprathreshold trials.
    pub lapse: f64,
    /// False-alarm rate, used as the guess rate for yes/no runs.
    pub false_alarm_rate: f64,
    /// Peak-gain grid (log10 sensitivity).
    pub peak_gain_values: Vec<f64>,
    /// Peak-frequency grid (cpd).
    pub peak_freq_values: Vec<f64>,
    /// Bandwidth grid (octaves).
    pub bandwidth_values: Vec<f64>,
    /// Truncation grid (log10 units).
    pub truncation_values: Vec<f64>,
    /// Stimulus spatial frequencies (cpd).
    pub stim_freqs: Vec<f64>,
    /// Stimulus log10 contrasts.
    pub stim_log_contrasts: Vec<f64>,
    /// Robust likelihood mixing weight rho in [0, 0.1].
    pub robust_likelihood_mix: f64,
    /// Trial budget. The embedder enforces it; the engine carries it for
    /// reporting only.
    pub max_trials: u32,
    /// Seed for the stimulus tie-break RNG; selection is deterministic
    /// given the seed.
    pub seed: u64,
    /// Optional boundary emphasis width in log10-contrast units. `None`
    /// disables the weight.
    pub boundary_sigma_log_c: Option<f64>,
    /// Optional informativeness boost for stimuli between 1 and 5 cpd.
    pub low_mid_freq_boost: Option<f64>,
    /// Drop parameter points whose CSF is still positive at 60 cpd.
    pub high_cutoff_prune: bool,
}

impl Default for QcsfConfig {
    fn default() -> Self {
        Self {
            num_afc: 4,
            psychometric_slope: 3.5,
            lapse: 0.04,
            false_alarm_rate: 0.01,
            peak_gain_values: linspace(0.5, 2.8, 10),
            peak_freq_values: logspace10(0.5f64.log10(), 18f64.log10(), 10),
            bandwidth_values: logspace10(0.8f64.log10(), 6f64.log10(), 5),
            truncation_values: linspace(0.0, 2.6, 5),
            stim_freqs: logspace10(0.5f64.log10(), 24f64.log10(), 12),
            stim_log_contrasts: linspace(-3.0, 0.0, 30),
            robust_likelihood_mix: 0.03,
            max_trials: 50,
            seed: 0,
            boundary_sigma_log_c: None,
            low_mid_freq_boost: None,
            high_cutoff_prune: false,
        }
    }
}

impl QcsfConfig {
    /// Stock configuration adjusted to a mode's psychometrics.
    pub fn for_mode(num_afc: u32, psychometric_slope: f64) -> Self {
        Self {
            num_afc,
            psychometric_slope,
            ..Self::default()
        }
    }

    /// Guess rate implied by the AFC policy: `1 / num_afc` for forced
    /// choice, the false-alarm rate for yes/no.
    pub fn guess_rate(&self) -> f64 {
        if self.num_afc >= 2 {
            1.0 / self.num_afc as f64
        } else {
            self.false_alarm_rate
        }
    }
}
