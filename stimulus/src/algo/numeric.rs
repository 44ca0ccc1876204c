//! Grid construction helpers.

/// `n` evenly spaced values over `[start, stop]`, endpoints included.
///
/// A single-element request returns `[start]`; an empty request returns an
/// empty vector.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// `n` log-spaced values: `10^x` for `x` evenly spaced over
/// `[start_exp, stop_exp]`.
pub fn logspace10(start_exp: f64, stop_exp: f64, n: usize) -> Vec<f64> {
    linspace(start_exp, stop_exp, n)
        .into_iter()
        .map(|x| 10f64.powf(x))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints_and_count() {
        let v = linspace(-3.0, 0.0, 30);
        assert_eq!(v.len(), 30);
        assert_relative_eq!(v[0], -3.0);
        assert_relative_eq!(v[29], 0.0);
        assert_relative_eq!(v[1] - v[0], 3.0 / 29.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linspace_degenerate() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.5, 9.0, 1), vec![2.5]);
    }

    #[test]
    fn test_logspace_endpoints() {
        let v = logspace10(0.5f64.log10(), 24f64.log10(), 12);
        assert_eq!(v.len(), 12);
        assert_relative_eq!(v[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(v[11], 24.0, epsilon = 1e-9);
        // log-spaced: constant ratio between neighbours
        let r0 = v[1] / v[0];
        let r1 = v[7] / v[6];
        assert_relative_eq!(r0, r1, epsilon = 1e-9);
    }
}
