//! Stimulus modes: the seam between the adaptive engine and the renderers.
//!
//! A mode owns its template set and the ground-truth label of the trial on
//! screen. The engine never sees pixels and the renderers never see the
//! posterior; the embedder wires them together through this trait.

use crate::engine::StimulusChoice;
use crate::error::QcsfError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stimulus::calibration::Calibration;
use stimulus::frame::Frame;
use stimulus::gabor::{draw_gabor, GaborParams};
use stimulus::letter::draw_letter;
use stimulus::optotype::{
    TemplateSet, DEFAULT_CENTER_FREQ, DEFAULT_OCTAVE_BANDWIDTH, DEFAULT_TEMPLATE_SIZE, E_LABELS,
    SLOAN_LABELS,
};

/// Psychometric slope for grating and tumbling-E tasks.
pub const GRATING_SLOPE: f64 = 3.5;
/// Psychometric slope for the 10-letter Sloan task.
pub const SLOAN_SLOPE: f64 = 4.05;

/// Grating orientations and their response labels. Orientation 0 puts the
/// carrier along x, so the bars read vertical.
const GABOR_ORIENTATIONS: [(f64, &str); 4] = [
    (0.0, "vertical"),
    (45.0, "oblique-right"),
    (90.0, "horizontal"),
    (135.0, "oblique-left"),
];

const GABOR_LABELS: [&str; 4] = [
    "vertical",
    "oblique-right",
    "horizontal",
    "oblique-left",
];

/// Yes/no key set: the four orientations plus an explicit rejection. A
/// target is present on every trial, so "none" never scores correct.
const GABOR_YES_NO_LABELS: [&str; 5] = [
    "vertical",
    "oblique-right",
    "horizontal",
    "oblique-left",
    "none",
];

/// A stimulus family bound to its psychometrics, rendering, and scoring.
pub trait StimulusMode {
    /// One-time setup (template synthesis); no-op for Gabor modes.
    fn prepare(&mut self) -> Result<(), QcsfError>;

    /// Render `stim` into the frame, sample and remember the ground-truth
    /// label, and return it.
    fn render(
        &mut self,
        frame: &mut Frame<'_>,
        stim: &StimulusChoice,
        cal: &Calibration,
    ) -> Result<&'static str, QcsfError>;

    /// Score a response against the last rendered trial.
    fn check(&self, response: &str) -> bool;

    /// Response alternatives (fixes the engine's guess-rate policy).
    fn num_afc(&self) -> u32;

    /// Psychometric slope for this family.
    fn slope(&self) -> f64;

    /// Accepted response labels.
    fn labels(&self) -> &[&'static str];
}

/// Clamp an engine-chosen stimulus into the renderers' contract range.
fn clamped(stim: &StimulusChoice) -> (f64, f64) {
    (stim.freq.max(0.05), stim.contrast.clamp(1e-4, 1.0))
}

/// Four-alternative Gabor orientation discrimination.
pub struct Gabor4Afc {
    rng: ChaCha8Rng,
    current: Option<&'static str>,
}

impl Gabor4Afc {
    /// Create the mode with a seeded orientation sampler.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            current: None,
        }
    }
}

impl StimulusMode for Gabor4Afc {
    fn prepare(&mut self) -> Result<(), QcsfError> {
        Ok(())
    }

    fn render(
        &mut self,
        frame: &mut Frame<'_>,
        stim: &StimulusChoice,
        cal: &Calibration,
    ) -> Result<&'static str, QcsfError> {
        let (cpd, contrast) = clamped(stim);
        let (orientation_deg, label) =
            GABOR_ORIENTATIONS[self.rng.gen_range(0..GABOR_ORIENTATIONS.len())];
        draw_gabor(
            frame,
            &GaborParams {
                cpd,
                contrast,
                orientation_deg,
            },
            cal,
        );
        self.current = Some(label);
        Ok(label)
    }

    fn check(&self, response: &str) -> bool {
        self.current.map_or(false, |l| l == response)
    }

    fn num_afc(&self) -> u32 {
        4
    }

    fn slope(&self) -> f64 {
        GRATING_SLOPE
    }

    fn labels(&self) -> &[&'static str] {
        &GABOR_LABELS
    }
}

/// Yes/no Gabor detection with orientation report.
///
/// Same rendering as [`Gabor4Afc`] but scored as a 1-AFC detection task:
/// the engine uses the false-alarm rate as its guess rate, and the extra
/// "none" key is always wrong because a target is always present.
pub struct GaborYesNo {
    inner: Gabor4Afc,
}

impl GaborYesNo {
    /// Create the mode with a seeded orientation sampler.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Gabor4Afc::new(seed),
        }
    }
}

impl StimulusMode for GaborYesNo {
    fn prepare(&mut self) -> Result<(), QcsfError> {
        self.inner.prepare()
    }

    fn render(
        &mut self,
        frame: &mut Frame<'_>,
        stim: &StimulusChoice,
        cal: &Calibration,
    ) -> Result<&'static str, QcsfError> {
        self.inner.render(frame, stim, cal)
    }

    fn check(&self, response: &str) -> bool {
        self.inner.check(response)
    }

    fn num_afc(&self) -> u32 {
        1
    }

    fn slope(&self) -> f64 {
        GRATING_SLOPE
    }

    fn labels(&self) -> &[&'static str] {
        &GABOR_YES_NO_LABELS
    }
}

/// Four-direction tumbling-E discrimination.
pub struct TumblingE {
    rng: ChaCha8Rng,
    templates: Option<TemplateSet>,
    current: Option<&'static str>,
}

impl TumblingE {
    /// Create the mode with a seeded direction sampler; call `prepare`
    /// before rendering.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            templates: None,
            current: None,
        }
    }
}

impl StimulusMode for TumblingE {
    fn prepare(&mut self) -> Result<(), QcsfError> {
        if self.templates.is_none() {
            self.templates = Some(TemplateSet::tumbling_e(
                DEFAULT_TEMPLATE_SIZE,
                DEFAULT_CENTER_FREQ,
                DEFAULT_OCTAVE_BANDWIDTH,
            )?);
        }
        Ok(())
    }

    fn render(
        &mut self,
        frame: &mut Frame<'_>,
        stim: &StimulusChoice,
        cal: &Calibration,
    ) -> Result<&'static str, QcsfError> {
        let templates = self.templates.as_ref().ok_or(QcsfError::ModeNotPrepared)?;
        let (cpd, contrast) = clamped(stim);
        let label = E_LABELS[self.rng.gen_range(0..E_LABELS.len())];
        let template = templates
            .get(label)
            .expect("tumbling-E set contains every direction");
        draw_letter(frame, template, cpd, contrast, cal);
        self.current = Some(label);
        Ok(label)
    }

    fn check(&self, response: &str) -> bool {
        self.current.map_or(false, |l| l == response)
    }

    fn num_afc(&self) -> u32 {
        4
    }

    fn slope(&self) -> f64 {
        GRATING_SLOPE
    }

    fn labels(&self) -> &[&'static str] {
        &E_LABELS
    }
}

/// Ten-letter Sloan identification.
pub struct Sloan {
    rng: ChaCha8Rng,
    templates: Option<TemplateSet>,
    current: Option<&'static str>,
}

impl Sloan {
    /// Create the mode with a seeded letter sampler; call `prepare` before
    /// rendering.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            templates: None,
            current: None,
        }
    }
}

impl StimulusMode for Sloan {
    fn prepare(&mut self) -> Result<(), QcsfError> {
        if self.templates.is_none() {
            self.templates = Some(TemplateSet::sloan(
                DEFAULT_TEMPLATE_SIZE,
                DEFAULT_CENTER_FREQ,
                DEFAULT_OCTAVE_BANDWIDTH,
            )?);
        }
        Ok(())
    }

    fn render(
        &mut self,
        frame: &mut Frame<'_>,
        stim: &StimulusChoice,
        cal: &Calibration,
    ) -> Result<&'static str, QcsfError> {
        let templates = self.templates.as_ref().ok_or(QcsfError::ModeNotPrepared)?;
        let (cpd, contrast) = clamped(stim);
        let label = SLOAN_LABELS[self.rng.gen_range(0..SLOAN_LABELS.len())];
        let template = templates
            .get(label)
            .expect("Sloan set contains every letter");
        draw_letter(frame, template, cpd, contrast, cal);
        self.current = Some(label);
        Ok(label)
    }

    fn check(&self, response: &str) -> bool {
        self.current.map_or(false, |l| l == response)
    }

    fn num_afc(&self) -> u32 {
        10
    }

    fn slope(&self) -> f64 {
        SLOAN_SLOPE
    }

    fn labels(&self) -> &[&'static str] {
        &SLOAN_LABELS
    }
}
