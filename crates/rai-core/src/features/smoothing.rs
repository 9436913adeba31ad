// One-dimensional Gaussian smoothing with reflect-at-boundary extension.

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Normalized Gaussian weights for offsets `-radius..=radius`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-(x * x) / denom).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Map an out-of-range index onto `0..len` by mirroring about the edges
/// (`d c b a | a b c d | d c b a`).
fn reflect_index(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Smooth `values` with a Gaussian kernel of standard deviation `sigma`
/// (in samples). Returns a copy when `sigma` is not positive.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    if values.is_empty() || sigma.is_nan() || sigma <= 0.0 {
        return values.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let len = values.len();

    (0..len as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[reflect_index(i + k as isize - radius, len)])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!(approx_eq(k.iter().sum::<f64>(), 1.0, 1e-12));
        for i in 0..k.len() {
            assert!(approx_eq(k[i], k[k.len() - 1 - i], 1e-15));
        }
        assert!(k[4] > k[3] && k[3] > k[2]);
    }

    #[test]
    fn reflect_index_mirrors_edges() {
        // len 4: ... 1 0 | 0 1 2 3 | 3 2 ...
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(9, 4), 1);
        assert_eq!(reflect_index(2, 4), 2);
    }

    #[test]
    fn constant_series_is_unchanged() {
        let smoothed = gaussian_smooth(&[3.0; 6], 1.0);
        for v in smoothed {
            assert!(approx_eq(v, 3.0, 1e-12));
        }
    }

    #[test]
    fn step_is_spread_out() {
        let smoothed = gaussian_smooth(&[0.0, 10.0, 10.0, 10.0, 10.0], 1.0);
        // Interior sample pulled below 10 by the leading zero, but stays close.
        assert!(smoothed[2] > 9.0 && smoothed[2] < 10.0);
        // Leading zero is lifted.
        assert!(smoothed[0] > 0.0);
        assert!(smoothed[0] < smoothed[1] && smoothed[1] < smoothed[2]);
    }

    #[test]
    fn kernel_wider_than_series_still_works() {
        let smoothed = gaussian_smooth(&[1.0, 2.0], 1.0);
        assert_eq!(smoothed.len(), 2);
        assert!(smoothed.iter().all(|v| *v > 1.0 && *v < 2.0));
    }

    #[test]
    fn non_positive_sigma_returns_input() {
        assert_eq!(gaussian_smooth(&[1.0, 5.0, 2.0], 0.0), vec![1.0, 5.0, 2.0]);
    }
}
