//! Filtered-letter renderer: scale a template to the calibrated visual
//! size and composite it on a mid-grey canvas.

use crate::calibration::Calibration;
use crate::frame::Frame;
use crate::optotype::Template;
use ndarray::Array2;

/// Draw a bandpass-filtered optotype at the size that puts its filter
/// centre frequency at `cpd` for the calibrated observer.
///
/// `letter_deg = center_freq / cpd`, converted to pixels and clamped to
/// 90% of the smaller canvas dimension. The canvas is cleared to mid-grey
/// and the template is bilinearly resampled over the centred square:
/// `lum = mid + mid * contrast * T`, clamped to `[0, 255]`.
pub fn draw_letter(
    frame: &mut Frame<'_>,
    template: &Template,
    cpd: f64,
    contrast: f64,
    cal: &Calibration,
) {
    let mid = cal.mid_point as f64;
    frame.fill(cal.mid_point);

    let w = frame.width();
    let h = frame.height();
    let letter_deg = template.center_freq / cpd;
    let letter_px = (letter_deg * cal.pix_per_deg()).min(0.9 * w.min(h) as f64);
    if letter_px <= 0.0 {
        return;
    }

    let x0 = (w as f64 - letter_px) / 2.0;
    let y0 = (h as f64 - letter_px) / 2.0;
    let scale = template.n as f64 / letter_px;

    let xs = x0.floor().max(0.0) as usize;
    let xe = ((x0 + letter_px).ceil().max(0.0) as usize).min(w);
    let ys = y0.floor().max(0.0) as usize;
    let ye = ((y0 + letter_px).ceil().max(0.0) as usize).min(h);

    for y in ys..ye {
        let ty = (y as f64 + 0.5 - y0) * scale - 0.5;
        for x in xs..xe {
            let tx = (x as f64 + 0.5 - x0) * scale - 0.5;
            let t = sample_bilinear(&template.data, tx, ty);
            let lum = mid + mid * contrast * t;
            frame.put_luma(x, y, lum.round().clamp(0.0, 255.0) as u8);
        }
    }
}

/// Clamp-to-edge bilinear sample on the template lattice; positions more
/// than one texel outside contribute nothing.
fn sample_bilinear(data: &Array2<f64>, x: f64, y: f64) -> f64 {
    let (nrows, ncols) = data.dim();
    if x <= -1.0 || y <= -1.0 || x >= ncols as f64 || y >= nrows as f64 {
        return 0.0;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let ix0 = (x0 as isize).clamp(0, ncols as isize - 1) as usize;
    let ix1 = (x0 as isize + 1).clamp(0, ncols as isize - 1) as usize;
    let iy0 = (y0 as isize).clamp(0, nrows as isize - 1) as usize;
    let iy1 = (y0 as isize + 1).clamp(0, nrows as isize - 1) as usize;

    data[[iy0, ix0]] * (1.0 - fx) * (1.0 - fy)
        + data[[iy0, ix1]] * fx * (1.0 - fy)
        + data[[iy1, ix0]] * (1.0 - fx) * fy
        + data[[iy1, ix1]] * fx * fy
}
