//! Result derivation: plausibility guards, AULCSF rank, predicted Snellen
//! acuity, and landmark evaluation for a completed run.

use crate::csf::{self, CsfParams, CsfSample};
use crate::engine::{QcsfEngine, TrialRecord};
use serde::Serialize;

/// Empirical ceiling on the reported cutoff frequency (human foveal limit).
const MAX_CUTOFF_CPD: f64 = 60.0;

/// Cutoffs above this are treated as implausible and shrunk by the guard.
const IMPLAUSIBLE_CUTOFF_CPD: f64 = 42.0;

/// Maximum shrink rounds applied by the cutoff guard.
const MAX_SHRINK_ROUNDS: usize = 5;

/// Frequency band whose trial coverage the guard checks, in cpd.
const LOW_FREQ_BAND_CPD: (f64, f64) = (0.5, 5.0);

/// Chart landmarks: name, frequency (cpd), required linear sensitivity.
const LANDMARKS: [(&str, f64, f64); 5] = [
    ("1.5 cpd", 1.5, 30.0),
    ("3 cpd", 3.0, 60.0),
    ("6 cpd", 6.0, 50.0),
    ("12 cpd", 12.0, 15.0),
    ("18 cpd", 18.0, 5.0),
];

/// AULCSF rank buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rank {
    Superior,
    AboveAverage,
    Normal,
    BelowAverage,
    Impaired,
    /// AULCSF could not be computed; raw parameters are still reported.
    Error,
}

impl Rank {
    /// Bucket an AULCSF value.
    pub fn from_aulcsf(aulcsf: f64) -> Self {
        if aulcsf > 2.0 {
            Rank::Superior
        } else if aulcsf > 1.6 {
            Rank::AboveAverage
        } else if aulcsf > 1.2 {
            Rank::Normal
        } else if aulcsf > 0.8 {
            Rank::BelowAverage
        } else {
            Rank::Impaired
        }
    }

    /// Display string for the score report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Superior => "SUPERIOR",
            Rank::AboveAverage => "ABOVE AVERAGE",
            Rank::Normal => "NORMAL",
            Rank::BelowAverage => "BELOW AVERAGE",
            Rank::Impaired => "IMPAIRED",
            Rank::Error => "ERROR",
        }
    }
}

/// Outcome of one landmark comparison.
#[derive(Debug, Clone, Serialize)]
pub struct LandmarkResult {
    /// Chart row name.
    pub name: &'static str,
    /// Landmark frequency in cpd.
    pub freq: f64,
    /// Required linear sensitivity.
    pub required: f64,
    /// Measured linear sensitivity `10^logS(freq)`.
    pub measured: f64,
    /// Whether the measurement meets the requirement.
    pub pass: bool,
}

/// Options for result derivation.
#[derive(Debug, Clone, Serialize)]
pub struct ResultOptions {
    /// Apply the plausibility guard before deriving scalars. Whether to
    /// guard is a product decision; every adjustment is reported either
    /// way.
    pub apply_plausibility_guard: bool,
}

impl Default for ResultOptions {
    fn default() -> Self {
        Self {
            apply_plausibility_guard: true,
        }
    }
}

/// Everything reported for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Parameters used for scoring (after any guards).
    pub params: CsfParams,
    /// Posterior-mean parameters before guards.
    pub raw_params: CsfParams,
    /// Area under the log CSF.
    pub aulcsf: f64,
    /// Rank bucket.
    pub rank: Rank,
    /// High-frequency cutoff in cpd, clamped to (0, 60].
    pub cutoff_freq: Option<f64>,
    /// Predicted Snellen acuity, e.g. `20/32`.
    pub snellen: Option<String>,
    /// Plottable curve for the scored parameters.
    pub curve: Vec<CsfSample>,
    /// Landmark pass/fail list.
    pub landmarks: Vec<LandmarkResult>,
    /// Human-readable notes for every guard that fired.
    pub guard_notes: Vec<String>,
    /// Full trial history.
    pub history: Vec<TrialRecord>,
}

/// Derive the report for a completed engine.
pub fn compute_result(engine: &QcsfEngine, options: &ResultOptions) -> TestResult {
    let raw_params = engine.expected_estimate();
    let mut params = raw_params;
    let mut guard_notes = Vec::new();

    if options.apply_plausibility_guard {
        apply_guards(engine, &mut params, &mut guard_notes);
    }

    let aulcsf = engine.aulcsf(&params);
    if !aulcsf.is_finite() {
        return TestResult {
            params,
            raw_params,
            aulcsf: 0.0,
            rank: Rank::Error,
            cutoff_freq: None,
            snellen: None,
            curve: Vec::new(),
            landmarks: Vec::new(),
            guard_notes,
            history: engine.history().to_vec(),
        };
    }

    let cutoff_freq = falling_zero_crossing(&params).map(|f| f.min(MAX_CUTOFF_CPD));
    TestResult {
        params,
        raw_params,
        aulcsf,
        rank: Rank::from_aulcsf(aulcsf),
        cutoff_freq,
        snellen: cutoff_freq.map(snellen_string),
        curve: engine.csf_curve(&params),
        landmarks: evaluate_landmarks(engine, &params),
        guard_notes,
        history: engine.history().to_vec(),
    }
}

fn apply_guards(engine: &QcsfEngine, params: &mut CsfParams, notes: &mut Vec<String>) {
    // Runs that never probed low frequencies cannot pin down the peak
    // position or the truncation; bias them conservative.
    let low_freq_trials = engine
        .history()
        .iter()
        .filter(|t| {
            let freq = engine.stimuli()[t.stim_index as usize].freq;
            (LOW_FREQ_BAND_CPD.0..=LOW_FREQ_BAND_CPD.1).contains(&freq)
        })
        .count();
    if low_freq_trials < 2 {
        let before = *params;
        params.peak_freq = params.peak_freq.min(4.5);
        params.bandwidth = params.bandwidth.max(1.35);
        params.truncation = params.truncation.max(1.8);
        if *params != before {
            notes.push(format!(
                "low-frequency coverage ({low_freq_trials} trials in 0.5-5 cpd): \
                 biased to f={:.2}, b={:.2}, d={:.2}",
                params.peak_freq, params.bandwidth, params.truncation
            ));
        }
    }

    let before = *params;
    params.peak_freq = params.peak_freq.min(10.0);
    params.bandwidth = params.bandwidth.max(1.15);
    params.truncation = params.truncation.max(1.4);
    if *params != before {
        notes.push(format!(
            "clamped to f={:.2}, b={:.2}, d={:.2}",
            params.peak_freq, params.bandwidth, params.truncation
        ));
    }

    for round in 1..=MAX_SHRINK_ROUNDS {
        match falling_zero_crossing(params) {
            Some(cutoff) if cutoff > IMPLAUSIBLE_CUTOFF_CPD => {
                params.peak_freq = (0.9 * params.peak_freq).max(2.2);
                params.bandwidth = (params.bandwidth + 0.12).min(2.8);
                params.truncation = (params.truncation + 0.15).min(3.2);
                notes.push(format!(
                    "cutoff {cutoff:.1} cpd implausible (round {round}): \
                     shrunk to f={:.2}, b={:.2}, d={:.2}",
                    params.peak_freq, params.bandwidth, params.truncation
                ));
            }
            _ => break,
        }
    }
}

/// Lowest frequency above which `logS` falls through zero, interpolated
/// linearly in log-frequency. `None` when the curve never rises above
/// zero; the scan ceiling (100 cpd) when it never falls back below.
fn falling_zero_crossing(params: &CsfParams) -> Option<f64> {
    const SCAN_LO_LOG10: f64 = -0.4;
    const SCAN_HI_LOG10: f64 = 2.0;
    const SCAN_STEPS: usize = 1200;

    let step = (SCAN_HI_LOG10 - SCAN_LO_LOG10) / SCAN_STEPS as f64;
    let mut prev_x = SCAN_LO_LOG10;
    let mut prev_s = csf::log_sensitivity(10f64.powf(prev_x), params);
    let mut seen_positive = prev_s > 0.0;
    for i in 1..=SCAN_STEPS {
        let x = SCAN_LO_LOG10 + step * i as f64;
        let s = csf::log_sensitivity(10f64.powf(x), params);
        if seen_positive && prev_s > 0.0 && s <= 0.0 {
            let t = prev_s / (prev_s - s);
            return Some(10f64.powf(prev_x + t * step));
        }
        seen_positive = seen_positive || s > 0.0;
        prev_x = x;
        prev_s = s;
    }
    if seen_positive && prev_s > 0.0 {
        // Still above zero at the scan ceiling.
        return Some(10f64.powf(SCAN_HI_LOG10));
    }
    None
}

/// `20/denominator` with 20/20 vision at a 30 cpd cutoff.
fn snellen_string(cutoff_cpd: f64) -> String {
    format!("20/{}", (20.0 * 30.0 / cutoff_cpd).round() as i64)
}

fn evaluate_landmarks(engine: &QcsfEngine, params: &CsfParams) -> Vec<LandmarkResult> {
    LANDMARKS
        .iter()
        .map(|&(name, freq, required)| {
            let measured = 10f64.powf(engine.evaluate_csf(freq, params));
            LandmarkResult {
                name,
                freq,
                required,
                measured,
                pass: measured >= required,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QcsfConfig;
    use approx::assert_relative_eq;

    fn reference_params() -> CsfParams {
        CsfParams {
            gain: 2.0,
            peak_freq: 4.0,
            bandwidth: 1.3,
            truncation: 1.8,
        }
    }

    #[test]
    fn test_rank_buckets() {
        assert_eq!(Rank::from_aulcsf(2.3), Rank::Superior);
        assert_eq!(Rank::from_aulcsf(1.8), Rank::AboveAverage);
        assert_eq!(Rank::from_aulcsf(1.4), Rank::Normal);
        assert_eq!(Rank::from_aulcsf(1.0), Rank::BelowAverage);
        assert_eq!(Rank::from_aulcsf(0.4), Rank::Impaired);
        assert_eq!(Rank::from_aulcsf(2.0), Rank::AboveAverage);
        assert_eq!(Rank::Impaired.as_str(), "IMPAIRED");
    }

    #[test]
    fn test_zero_crossing_for_reference_curve() {
        // Analytic cutoff for the reference parameters: 4 * 10^0.50435.
        let cutoff = falling_zero_crossing(&reference_params()).unwrap();
        assert_relative_eq!(cutoff, 12.78, epsilon = 0.02);
    }

    #[test]
    fn test_zero_crossing_absent_for_negative_curve() {
        let blind = CsfParams {
            gain: -0.5,
            peak_freq: 4.0,
            bandwidth: 1.3,
            truncation: 0.5,
        };
        assert!(falling_zero_crossing(&blind).is_none());
    }

    #[test]
    fn test_snellen_formula() {
        assert_eq!(snellen_string(30.0), "20/20");
        assert_eq!(snellen_string(60.0), "20/10");
        assert_eq!(snellen_string(12.78), "20/47");
    }

    #[test]
    fn test_landmarks_for_reference_curve() {
        let engine = QcsfEngine::new(QcsfConfig::default()).unwrap();
        let results = evaluate_landmarks(&engine, &reference_params());
        assert_eq!(results.len(), 5);
        // The reference curve is heavily truncated (d = 1.8): at 1.5 cpd
        // it sits on the plateau's shoulder with 10^0.574 = 3.7, well
        // under the 30.0 the chart row requires.
        let by_name: Vec<(&str, bool)> = results.iter().map(|r| (r.name, r.pass)).collect();
        assert_eq!(
            by_name,
            vec![
                ("1.5 cpd", false),
                ("3 cpd", true),
                ("6 cpd", true),
                ("12 cpd", false),
                ("18 cpd", false),
            ]
        );
        assert!((results[0].measured - 3.74).abs() < 0.05);
    }

    #[test]
    fn test_compute_result_on_fresh_engine_guards_and_reports() {
        let engine = QcsfEngine::new(QcsfConfig::default()).unwrap();
        let result = compute_result(&engine, &ResultOptions::default());
        // No trials at all: the low-frequency guard must fire.
        assert!(!result.guard_notes.is_empty());
        assert!(result.aulcsf >= 0.0);
        assert!(result.curve.len() >= 100);
        assert_eq!(result.landmarks.len(), 5);
        assert!(result.history.is_empty());
        if let Some(cutoff) = result.cutoff_freq {
            assert!(cutoff > 0.0 && cutoff <= MAX_CUTOFF_CPD);
            assert!(result.snellen.is_some());
        }
    }

    #[test]
    fn test_guard_can_be_disabled() {
        let engine = QcsfEngine::new(QcsfConfig::default()).unwrap();
        let result = compute_result(
            &engine,
            &ResultOptions {
                apply_plausibility_guard: false,
            },
        );
        assert!(result.guard_notes.is_empty());
        assert_eq!(result.params, result.raw_params);
    }

    #[test]
    fn test_cutoff_clamped_to_foveal_ceiling() {
        // A hawk-eye parameter point whose parabola stays positive far
        // beyond 60 cpd.
        let hawk = CsfParams {
            gain: 2.8,
            peak_freq: 18.0,
            bandwidth: 6.0,
            truncation: 1.8,
        };
        let cutoff = falling_zero_crossing(&hawk).unwrap().min(MAX_CUTOFF_CPD);
        assert!(cutoff <= MAX_CUTOFF_CPD);
        assert!(cutoff > 0.0);
    }
}
