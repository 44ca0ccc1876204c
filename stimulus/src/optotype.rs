//! Optotype rasterization and bandpass-filtered template synthesis.
//!
//! Glyphs are defined as predicates on the conventional 5x5 stroke grid
//! (stroke width = 1 unit), rasterized so the letter spans 75% of the
//! square image, converted to signed values (`pixel/255 - 0.5`, ink dark),
//! and passed through the raised-cosine bandpass filter. The filtered,
//! peak-normalized result is what the letter renderer scales on screen.

use crate::bandpass::{BandpassFilter, FilterError};
use ndarray::Array2;

/// Raster resolution used by the stock template sets.
pub const DEFAULT_TEMPLATE_SIZE: usize = 128;
/// Stock bandpass centre in cycles per letter.
pub const DEFAULT_CENTER_FREQ: f64 = 4.0;
/// Stock bandpass width in octaves.
pub const DEFAULT_OCTAVE_BANDWIDTH: f64 = 1.0;

/// Fraction of the raster spanned by the drawn letter.
const LETTER_SPAN_FRACTION: f64 = 0.75;

/// The ten standardized high-legibility Sloan letters.
pub const SLOAN_LABELS: [&str; 10] = ["C", "D", "H", "K", "N", "O", "R", "S", "V", "Z"];

/// Tumbling-E opening directions, one per 90-degree rotation.
pub const E_LABELS: [&str; 4] = ["right", "down", "left", "up"];

/// Bandpass-filtered optotype, contrast-normalized to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct Template {
    /// Raster resolution per axis.
    pub n: usize,
    /// Centre frequency of the filter that produced it, cycles per letter.
    pub center_freq: f64,
    /// Filtered signed image.
    pub data: Array2<f64>,
}

/// Label -> filtered template mapping for one optotype family.
///
/// Built once per session in a mode's `prepare()`; read-only afterwards.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    center_freq: f64,
    labels: Vec<&'static str>,
    templates: Vec<Template>,
}

impl TemplateSet {
    /// Build filtered templates for the ten Sloan letters.
    pub fn sloan(
        n: usize,
        center_freq: f64,
        octave_bandwidth: f64,
    ) -> Result<Self, FilterError> {
        let filter = BandpassFilter::new(n, center_freq, octave_bandwidth)?;
        let mut labels = Vec::with_capacity(SLOAN_GLYPHS.len());
        let mut templates = Vec::with_capacity(SLOAN_GLYPHS.len());
        for &(label, glyph) in SLOAN_GLYPHS.iter() {
            let raster = rasterize(n, glyph);
            templates.push(filter_raster(&filter, raster)?);
            labels.push(label);
        }
        Ok(Self {
            center_freq,
            labels,
            templates,
        })
    }

    /// Build filtered templates for the four tumbling-E rotations.
    pub fn tumbling_e(
        n: usize,
        center_freq: f64,
        octave_bandwidth: f64,
    ) -> Result<Self, FilterError> {
        let filter = BandpassFilter::new(n, center_freq, octave_bandwidth)?;
        let mut raster = rasterize(n, glyph_e_right);
        let mut labels = Vec::with_capacity(E_LABELS.len());
        let mut templates = Vec::with_capacity(E_LABELS.len());
        for &label in E_LABELS.iter() {
            templates.push(filter_raster(&filter, raster.clone())?);
            labels.push(label);
            raster = rotate_90_cw(&raster, n);
        }
        Ok(Self {
            center_freq,
            labels,
            templates,
        })
    }

    /// Centre frequency shared by every template in the set.
    pub fn center_freq(&self) -> f64 {
        self.center_freq
    }

    /// Labels in presentation order.
    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    /// Look up the template for a label.
    pub fn get(&self, label: &str) -> Option<&Template> {
        self.labels
            .iter()
            .position(|&l| l == label)
            .map(|i| &self.templates[i])
    }
}

fn filter_raster(filter: &BandpassFilter, mut re: Vec<f64>) -> Result<Template, FilterError> {
    let n = filter.n();
    let mut im = vec![0.0; n * n];
    filter.apply(&mut re, &mut im)?;
    Ok(Template {
        n,
        center_freq: filter.center_freq(),
        data: Array2::from_shape_vec((n, n), re).expect("raster length matches template shape"),
    })
}

/// Rasterize a glyph predicate to a signed image (ink -0.5, background 0.5).
fn rasterize(n: usize, glyph: fn(f64, f64) -> bool) -> Vec<f64> {
    let side = LETTER_SPAN_FRACTION * n as f64;
    let origin = (n as f64 - side) / 2.0;
    let mut signed = vec![0.5; n * n];
    for y in 0..n {
        let v = (y as f64 + 0.5 - origin) / side * 5.0;
        for x in 0..n {
            let u = (x as f64 + 0.5 - origin) / side * 5.0;
            if (0.0..=5.0).contains(&u) && (0.0..=5.0).contains(&v) && glyph(u, v) {
                signed[y * n + x] = -0.5;
            }
        }
    }
    signed
}

/// Rotate a square raster 90 degrees clockwise.
fn rotate_90_cw(src: &[f64], n: usize) -> Vec<f64> {
    let mut dst = vec![0.0; n * n];
    for y in 0..n {
        for x in 0..n {
            dst[y * n + x] = src[(n - 1 - x) * n + y];
        }
    }
    dst
}

// Stroke-grid geometry. Coordinates are (u, v) in [0, 5] with v growing
// downward; strokes are 1 unit wide.

fn in_rect(u: f64, v: f64, u0: f64, v0: f64, u1: f64, v1: f64) -> bool {
    u >= u0 && u <= u1 && v >= v0 && v <= v1
}

fn in_ring(u: f64, v: f64, inner: f64, outer: f64) -> bool {
    let du = u - 2.5;
    let dv = v - 2.5;
    let r = (du * du + dv * dv).sqrt();
    r >= inner && r <= outer
}

fn near_segment(u: f64, v: f64, a: (f64, f64), b: (f64, f64), half_width: f64) -> bool {
    let (ax, ay) = a;
    let (bx, by) = b;
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    let t = (((u - ax) * dx + (v - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let px = ax + t * dx;
    let py = ay + t * dy;
    let du = u - px;
    let dv = v - py;
    du * du + dv * dv <= half_width * half_width
}

fn glyph_c(u: f64, v: f64) -> bool {
    in_ring(u, v, 1.5, 2.5) && !(u > 2.5 && (v - 2.5).abs() < 0.5)
}

fn glyph_d(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || (u >= 2.5 && in_ring(u, v, 1.5, 2.5))
        || in_rect(u, v, 1.0, 0.0, 2.5, 1.0)
        || in_rect(u, v, 1.0, 4.0, 2.5, 5.0)
}

fn glyph_h(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || in_rect(u, v, 4.0, 0.0, 5.0, 5.0)
        || in_rect(u, v, 1.0, 2.0, 4.0, 3.0)
}

fn glyph_k(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || near_segment(u, v, (1.0, 2.5), (5.0, 0.0), 0.5)
        || near_segment(u, v, (1.0, 2.5), (5.0, 5.0), 0.5)
}

fn glyph_n(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || in_rect(u, v, 4.0, 0.0, 5.0, 5.0)
        || near_segment(u, v, (0.5, 0.5), (4.5, 4.5), 0.5)
}

fn glyph_o(u: f64, v: f64) -> bool {
    in_ring(u, v, 1.5, 2.5)
}

fn glyph_r(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || in_rect(u, v, 0.0, 0.0, 4.5, 1.0)
        || in_rect(u, v, 3.5, 0.0, 4.5, 3.0)
        || in_rect(u, v, 0.0, 2.0, 4.5, 3.0)
        || near_segment(u, v, (2.8, 3.0), (4.6, 5.0), 0.5)
}

fn glyph_s(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 5.0, 1.0)
        || in_rect(u, v, 0.0, 1.0, 1.0, 2.0)
        || in_rect(u, v, 0.0, 2.0, 5.0, 3.0)
        || in_rect(u, v, 4.0, 3.0, 5.0, 4.0)
        || in_rect(u, v, 0.0, 4.0, 5.0, 5.0)
}

fn glyph_v(u: f64, v: f64) -> bool {
    near_segment(u, v, (0.5, 0.0), (2.5, 5.0), 0.55)
        || near_segment(u, v, (4.5, 0.0), (2.5, 5.0), 0.55)
}

fn glyph_z(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 5.0, 1.0)
        || in_rect(u, v, 0.0, 4.0, 5.0, 5.0)
        || near_segment(u, v, (4.5, 1.0), (0.5, 4.0), 0.5)
}

/// Canonical right-opening E: left spine plus three horizontals.
fn glyph_e_right(u: f64, v: f64) -> bool {
    in_rect(u, v, 0.0, 0.0, 1.0, 5.0)
        || in_rect(u, v, 0.0, 0.0, 5.0, 1.0)
        || in_rect(u, v, 0.0, 2.0, 5.0, 3.0)
        || in_rect(u, v, 0.0, 4.0, 5.0, 5.0)
}

const SLOAN_GLYPHS: [(&str, fn(f64, f64) -> bool); 10] = [
    ("C", glyph_c),
    ("D", glyph_d),
    ("H", glyph_h),
    ("K", glyph_k),
    ("N", glyph_n),
    ("O", glyph_o),
    ("R", glyph_r),
    ("S", glyph_s),
    ("V", glyph_v),
    ("Z", glyph_z),
];
