//! The qCSF adaptive engine: grids, precomputed likelihoods, one-step-ahead
//! expected-entropy stimulus selection, and the Bayesian posterior update.
//!
//! The engine is a single-threaded pull API. The embedder alternates
//! `select_stimulus` / `update` until its trial budget is exhausted, then
//! hands the engine to [`crate::result::compute_result`]. Construction does
//! all the heavy lifting (grid products, likelihood matrix, scratch
//! buffers); the per-trial calls never allocate.

use crate::config::QcsfConfig;
use crate::csf::{self, CsfParams, CsfSample};
use crate::error::QcsfError;
use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::cmp::Ordering;

/// Hard cap on the parameter grid size.
const MAX_PARAM_POINTS: usize = 5000;

/// Likelihoods are clamped into this band so no response ever carries
/// infinite evidence.
const LIKELIHOOD_FLOOR: f64 = 0.001;
const LIKELIHOOD_CEIL: f64 = 0.999;

/// Entropy terms below this numerator are skipped instead of producing
/// 0 * log(0).
const ENTROPY_TERM_FLOOR: f64 = 1e-30;

/// Trials during which the tie-break draws from a fixed-size top set.
const WARMUP_TRIALS: u32 = 8;
const WARMUP_TOP_K: usize = 5;

/// Frequency at which pruned parameter points must have crossed zero.
const PRUNE_FREQ_CPD: f64 = 60.0;

/// One point of the stimulus grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stimulus {
    /// Spatial frequency in cycles per degree.
    pub freq: f64,
    /// log10 contrast.
    pub log_contrast: f64,
}

impl Stimulus {
    /// Linear contrast in (0, 1].
    pub fn contrast(&self) -> f64 {
        10f64.powf(self.log_contrast)
    }
}

/// Stimulus chosen for the next trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StimulusChoice {
    /// Index into the stimulus grid; pass back to `update`.
    pub stim_index: usize,
    /// Spatial frequency in cycles per degree.
    pub freq: f64,
    /// Linear contrast.
    pub contrast: f64,
    /// log10 contrast.
    pub log_contrast: f64,
}

/// Completed-trial record; history is append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialRecord {
    /// 1-based trial number.
    pub trial: u32,
    /// Stimulus grid index shown.
    pub stim_index: u32,
    /// Whether the response was scored correct.
    pub correct: bool,
}

/// Recoverable conditions the engine reports instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineWarning {
    /// Posterior mass vanished during an update; the previous posterior
    /// was kept.
    DegenerateUpdate {
        /// Trial at which the update was discarded.
        trial: u32,
    },
    /// Every expected-entropy score was non-finite; selection fell back
    /// to the stimulus with the highest predicted success rate.
    NonFiniteSelection {
        /// Trial being selected for (1-based).
        trial: u32,
    },
}

/// Bayesian adaptive qCSF engine.
///
/// Owns the parameter grid, stimulus grid, likelihood matrix, posterior,
/// and trial history exclusively. Two engines never share mutable state;
/// the likelihood matrix is immutable after construction.
pub struct QcsfEngine {
    config: QcsfConfig,
    params: Vec<CsfParams>,
    stimuli: Vec<Stimulus>,
    likelihood: Array2<f64>,
    posterior: Vec<f64>,
    history: Vec<TrialRecord>,
    warnings: Vec<EngineWarning>,
    trial_count: u32,
    rng: ChaCha8Rng,
    // Per-trial scratch, allocated once and reused.
    posterior_scratch: Vec<f64>,
    expected_entropy: Vec<f64>,
    success_prob: Vec<f64>,
    ranking: Vec<usize>,
}

impl QcsfEngine {
    /// Validate the configuration, build both grids and the likelihood
    /// matrix, and start from a uniform posterior.
    pub fn new(config: QcsfConfig) -> Result<Self, QcsfError> {
        validate(&config)?;

        let mut params = Vec::with_capacity(
            config.peak_gain_values.len()
                * config.peak_freq_values.len()
                * config.bandwidth_values.len()
                * config.truncation_values.len(),
        );
        for &gain in &config.peak_gain_values {
            for &peak_freq in &config.peak_freq_values {
                for &bandwidth in &config.bandwidth_values {
                    for &truncation in &config.truncation_values {
                        params.push(CsfParams {
                            gain,
                            peak_freq,
                            bandwidth,
                            truncation,
                        });
                    }
                }
            }
        }

        if config.high_cutoff_prune {
            params.retain(|p| csf::log_sensitivity(PRUNE_FREQ_CPD, p) <= 0.0);
            if params.is_empty() {
                return Err(QcsfError::PrunedToEmpty);
            }
        }
        if params.len() > MAX_PARAM_POINTS {
            return Err(QcsfError::GridTooLarge {
                got: params.len(),
                limit: MAX_PARAM_POINTS,
            });
        }

        let mut stimuli =
            Vec::with_capacity(config.stim_freqs.len() * config.stim_log_contrasts.len());
        for &freq in &config.stim_freqs {
            for &log_contrast in &config.stim_log_contrasts {
                stimuli.push(Stimulus { freq, log_contrast });
            }
        }

        let guess = config.guess_rate();
        let lapse = config.lapse;
        let slope = config.psychometric_slope;
        let mut likelihood = Array2::zeros((params.len(), stimuli.len()));
        for (h, p) in params.iter().enumerate() {
            for (s, stim) in stimuli.iter().enumerate() {
                // Signal strength: log sensitivity minus log threshold
                // contrast (-log_contrast is the threshold in log units).
                let x = csf::log_sensitivity(stim.freq, p) + stim.log_contrast;
                let psi = 1.0 / (1.0 + (-slope * x).exp());
                likelihood[[h, s]] =
                    (guess + (1.0 - guess - lapse) * psi).clamp(LIKELIHOOD_FLOOR, LIKELIHOOD_CEIL);
            }
        }

        let n_params = params.len();
        let n_stimuli = stimuli.len();
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            params,
            stimuli,
            likelihood,
            posterior: vec![1.0 / n_params as f64; n_params],
            history: Vec::new(),
            warnings: Vec::new(),
            trial_count: 0,
            rng,
            posterior_scratch: vec![0.0; n_params],
            expected_entropy: vec![0.0; n_stimuli],
            success_prob: vec![0.0; n_stimuli],
            ranking: Vec::with_capacity(n_stimuli),
        })
    }

    /// Pick the stimulus for the next trial.
    ///
    /// For every candidate, computes the predicted success probability
    /// `p = sum_h pi_h M[h,s]` and the expected posterior entropy
    /// `p H(post | correct) + (1-p) H(post | incorrect)`, then chooses
    /// uniformly at random among the `k` lowest scores (`k = 5` during
    /// warm-up, top decile after). If every score is non-finite the
    /// posterior is degenerate: the stimulus with the highest predicted
    /// success rate is returned and a warning recorded.
    pub fn select_stimulus(&mut self) -> StimulusChoice {
        let n_params = self.params.len();
        let n_stimuli = self.stimuli.len();

        let weights_on = self.config.boundary_sigma_log_c.is_some()
            || self.config.low_mid_freq_boost.is_some();
        let prior_entropy = self.posterior_entropy();
        let running_estimate = if weights_on {
            Some(self.expected_estimate())
        } else {
            None
        };

        for s in 0..n_stimuli {
            let mut p_bar = 0.0;
            for h in 0..n_params {
                p_bar += self.posterior[h] * self.likelihood[[h, s]];
            }
            self.success_prob[s] = p_bar;
            let q_bar = 1.0 - p_bar;

            let mut entropy_correct = 0.0;
            let mut entropy_incorrect = 0.0;
            for h in 0..n_params {
                let mass = self.posterior[h];
                let num_correct = mass * self.likelihood[[h, s]];
                if num_correct >= ENTROPY_TERM_FLOOR && p_bar > 0.0 {
                    let p = num_correct / p_bar;
                    entropy_correct -= p * p.log2();
                }
                let num_incorrect = mass * (1.0 - self.likelihood[[h, s]]);
                if num_incorrect >= ENTROPY_TERM_FLOOR && q_bar > 0.0 {
                    let p = num_incorrect / q_bar;
                    entropy_incorrect -= p * p.log2();
                }
            }
            let expected = p_bar * entropy_correct + q_bar * entropy_incorrect;

            // Optional emphasis weights act on the expected information
            // gain, then the score is folded back into entropy units so
            // the ascending ranking below applies either way.
            self.expected_entropy[s] = match &running_estimate {
                None => expected,
                Some(estimate) => {
                    let stim = self.stimuli[s];
                    let mut info_gain = (prior_entropy - expected).max(0.0);
                    if let Some(sigma) = self.config.boundary_sigma_log_c {
                        let threshold = -csf::log_sensitivity(stim.freq, estimate);
                        let z = (stim.log_contrast - threshold) / sigma;
                        info_gain *= 1.0 + (-0.5 * z * z).exp();
                    }
                    if let Some(boost) = self.config.low_mid_freq_boost {
                        if (1.0..=5.0).contains(&stim.freq) {
                            info_gain *= boost;
                        }
                    }
                    prior_entropy - info_gain
                }
            };
        }

        self.ranking.clear();
        self.ranking.extend(0..n_stimuli);
        let scores = &self.expected_entropy;
        self.ranking
            .sort_by(|&a, &b| match (scores[a].is_finite(), scores[b].is_finite()) {
                (true, true) => scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => Ordering::Equal,
            });

        let finite = scores.iter().filter(|v| v.is_finite()).count();
        if finite == 0 {
            let fallback = self
                .success_prob
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0);
            log::warn!(
                "all expected-entropy scores non-finite before trial {}; \
                 falling back to most detectable stimulus {fallback}",
                self.trial_count + 1
            );
            self.warnings.push(EngineWarning::NonFiniteSelection {
                trial: self.trial_count + 1,
            });
            return self.choice(fallback);
        }

        let top_k = if self.trial_count < WARMUP_TRIALS {
            WARMUP_TOP_K
        } else {
            ((n_stimuli as f64 * 0.1).ceil() as usize).max(1)
        }
        .min(finite);
        let pick = self.ranking[self.rng.gen_range(0..top_k)];
        self.choice(pick)
    }

    /// Fold one scored response into the posterior.
    ///
    /// `stim_index` must come from the latest `select_stimulus`. The
    /// observation likelihood is mixed toward chance by
    /// `robust_likelihood_mix` so a single wild response cannot zero out
    /// the posterior. If the updated mass still vanishes the previous
    /// posterior is kept and a warning recorded. Returns the new trial
    /// count.
    pub fn update(&mut self, stim_index: usize, correct: bool) -> Result<u32, QcsfError> {
        if stim_index >= self.stimuli.len() {
            return Err(QcsfError::StimulusIndex {
                index: stim_index,
                len: self.stimuli.len(),
            });
        }

        let rho = self.config.robust_likelihood_mix;
        let mut total = 0.0;
        for h in 0..self.params.len() {
            let m = self.likelihood[[h, stim_index]];
            let raw = if correct { m } else { 1.0 - m };
            let observed = (1.0 - rho) * raw + rho * 0.5;
            let mass = self.posterior[h] * observed;
            self.posterior_scratch[h] = mass;
            total += mass;
        }

        if total > 0.0 && total.is_finite() {
            for h in 0..self.params.len() {
                self.posterior[h] = self.posterior_scratch[h] / total;
            }
        } else {
            log::warn!(
                "posterior mass degenerate ({total}) at trial {}; keeping previous posterior",
                self.trial_count + 1
            );
            self.warnings.push(EngineWarning::DegenerateUpdate {
                trial: self.trial_count + 1,
            });
        }

        self.history.push(TrialRecord {
            trial: self.trial_count + 1,
            stim_index: stim_index as u32,
            correct,
        });
        self.trial_count += 1;
        Ok(self.trial_count)
    }

    /// Posterior-mode (MAP) parameter estimate.
    pub fn estimate(&self) -> CsfParams {
        let best = self
            .posterior
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.params[best]
    }

    /// Posterior-mean estimate with the peak frequency averaged in log10.
    pub fn expected_estimate(&self) -> CsfParams {
        let mut gain = 0.0;
        let mut log_freq = 0.0;
        let mut bandwidth = 0.0;
        let mut truncation = 0.0;
        for (p, &mass) in self.params.iter().zip(&self.posterior) {
            gain += mass * p.gain;
            log_freq += mass * p.peak_freq.log10();
            bandwidth += mass * p.bandwidth;
            truncation += mass * p.truncation;
        }
        CsfParams {
            gain,
            peak_freq: 10f64.powf(log_freq),
            bandwidth,
            truncation,
        }
    }

    /// Shannon entropy of the posterior in bits.
    pub fn posterior_entropy(&self) -> f64 {
        let mut entropy = 0.0;
        for &mass in &self.posterior {
            if mass >= ENTROPY_TERM_FLOOR {
                entropy -= mass * mass.log2();
            }
        }
        entropy
    }

    /// log10 sensitivity of `params` at `freq`.
    pub fn evaluate_csf(&self, freq: f64, params: &CsfParams) -> f64 {
        csf::log_sensitivity(freq, params)
    }

    /// Area under the log CSF for `params`.
    pub fn aulcsf(&self, params: &CsfParams) -> f64 {
        csf::aulcsf(params)
    }

    /// Plottable CSF curve for `params`.
    pub fn csf_curve(&self, params: &CsfParams) -> Vec<CsfSample> {
        csf::csf_curve(params)
    }

    /// Completed trials in order.
    pub fn history(&self) -> &[TrialRecord] {
        &self.history
    }

    /// Recoverable conditions hit so far.
    pub fn warnings(&self) -> &[EngineWarning] {
        &self.warnings
    }

    /// Number of completed trials.
    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    /// The stimulus grid.
    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }

    /// The parameter grid (after any pruning).
    pub fn params(&self) -> &[CsfParams] {
        &self.params
    }

    /// Current posterior mass per parameter point.
    pub fn posterior(&self) -> &[f64] {
        &self.posterior
    }

    /// Precomputed likelihood matrix, parameter-major.
    pub fn likelihood(&self) -> ArrayView2<'_, f64> {
        self.likelihood.view()
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &QcsfConfig {
        &self.config
    }

    fn choice(&self, stim_index: usize) -> StimulusChoice {
        let stim = self.stimuli[stim_index];
        StimulusChoice {
            stim_index,
            freq: stim.freq,
            contrast: stim.contrast(),
            log_contrast: stim.log_contrast,
        }
    }
}

fn validate(config: &QcsfConfig) -> Result<(), QcsfError> {
    if !matches!(config.num_afc, 1 | 4 | 10) {
        return Err(QcsfError::UnsupportedNumAfc(config.num_afc));
    }
    if !(config.psychometric_slope > 0.0) {
        return Err(QcsfError::NonPositiveSlope(config.psychometric_slope));
    }
    for (name, value) in [
        ("lapse", config.lapse),
        ("false_alarm_rate", config.false_alarm_rate),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(QcsfError::InvalidProbability { name, value });
        }
    }
    if !(0.0..=0.1).contains(&config.robust_likelihood_mix) {
        return Err(QcsfError::InvalidRobustMix(config.robust_likelihood_mix));
    }
    for (name, values) in [
        ("peak_gain_values", &config.peak_gain_values),
        ("peak_freq_values", &config.peak_freq_values),
        ("bandwidth_values", &config.bandwidth_values),
        ("truncation_values", &config.truncation_values),
        ("stim_freqs", &config.stim_freqs),
        ("stim_log_contrasts", &config.stim_log_contrasts),
    ] {
        if values.is_empty() {
            return Err(QcsfError::EmptyGrid(name));
        }
    }
    for (name, values) in [
        ("peak_freq_values", &config.peak_freq_values),
        ("bandwidth_values", &config.bandwidth_values),
        ("stim_freqs", &config.stim_freqs),
    ] {
        if let Some(&value) = values.iter().find(|v| **v <= 0.0) {
            return Err(QcsfError::NonPositiveGridValue { name, value });
        }
    }
    Ok(())
}
