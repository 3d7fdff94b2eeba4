//! Post-processing of circulation time-derivatives. Independent of the
//! assembly core: operates only on a short history of past values.

use faer::{MatMut, MatRef};
use itertools::{izip, Itertools};

use crate::error::{AssemblyError, Result};

/// Local-statistics Wiener filter over a zero-padded window of `window`
/// samples. The noise power is the mean of the local variances; where the
/// local variance does not exceed it the local mean is returned.
pub fn wiener(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.is_empty() {
        return series.to_vec();
    }
    let n = series.len() as isize;
    let hi = ((window - 1) / 2) as isize; // Samples after i
    let lo = (window - 1) as isize - hi; // Samples before i
    let w = window as f64;

    let (mean, var): (Vec<f64>, Vec<f64>) = (0..n)
        .map(|i| {
            let (s, s2) = (i - lo..=i + hi)
                .filter(|j| (0..n).contains(j))
                .map(|j| series[j as usize])
                .fold((0., 0.), |(s, s2), x| (s + x, s2 + x * x));
            let mean = s / w;
            (mean, s2 / w - mean * mean)
        })
        .unzip();

    let noise = var.iter().sum::<f64>() / var.len() as f64;

    izip!(series, &mean, &var)
        .map(|(&x, &m, &v)| {
            if v <= noise {
                m
            } else {
                (x - m) * (1. - noise / v) + m
            }
        })
        .collect_vec()
}

/// Replace each entry of `current` (circulation rates of one surface) by the
/// last sample of the filtered series formed by `history` followed by the
/// current value. A `window` of zero leaves `current` unchanged.
pub fn filter_gamma_dot(
    history: &[MatRef<f64>],
    mut current: MatMut<f64>,
    window: usize,
) -> Result<()> {
    if let Some(h) = history
        .iter()
        .find(|h| (h.nrows(), h.ncols()) != (current.nrows(), current.ncols()))
    {
        return Err(AssemblyError::shape(
            "gamma_dot history",
            (current.nrows(), current.ncols()),
            (h.nrows(), h.ncols()),
        ));
    }
    if window == 0 {
        return Ok(());
    }

    for j in 0..current.ncols() {
        for i in 0..current.nrows() {
            let series = history
                .iter()
                .map(|h| h[(i, j)])
                .chain(std::iter::once(current[(i, j)]))
                .collect_vec();
            if let Some(&last) = wiener(&series, window).last() {
                current[(i, j)] = last;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use faer::Mat;

    #[test]
    fn test_wiener_ramp() {
        let out = wiener(&[1., 2., 3., 4., 5.], 3);
        let expected = [1., 2., 3., 4., 3. + 48. / 35.];
        out.iter()
            .zip(expected.iter())
            .for_each(|(a, b)| assert_relative_eq!(a, b, epsilon = 1e-12));
    }

    #[test]
    fn test_wiener_zero_window_is_identity() {
        assert_eq!(wiener(&[3., -1.], 0), vec![3., -1.]);
    }

    #[test]
    fn test_filter_gamma_dot_uses_last_sample() {
        let history = [1., 2., 3., 4.]
            .iter()
            .map(|&v| Mat::from_fn(1, 2, |_, j| v * (j + 1) as f64))
            .collect_vec();
        let history_refs = history.iter().map(|h| h.as_ref()).collect_vec();
        let mut current = Mat::from_fn(1, 2, |_, j| 5. * (j + 1) as f64);
        filter_gamma_dot(&history_refs, current.as_mut(), 3).unwrap();
        assert_relative_eq!(current[(0, 0)], 3. + 48. / 35., epsilon = 1e-12);
        assert_relative_eq!(current[(0, 1)], 2. * (3. + 48. / 35.), epsilon = 1e-12);
    }

    #[test]
    fn test_filtering_off_by_default() {
        let window = crate::settings::AssemblySettings::default().gamma_dot_filtering;
        let history = vec![Mat::from_fn(2, 1, |i, _| i as f64); 3];
        let history_refs = history.iter().map(|h| h.as_ref()).collect_vec();
        let mut current = Mat::from_fn(2, 1, |i, _| 7. * i as f64);
        filter_gamma_dot(&history_refs, current.as_mut(), window).unwrap();
        assert_eq!(current[(1, 0)], 7.);
    }

    #[test]
    fn test_filter_gamma_dot_shape_mismatch() {
        let history = vec![Mat::<f64>::zeros(2, 2)];
        let history_refs = history.iter().map(|h| h.as_ref()).collect_vec();
        let mut current = Mat::<f64>::zeros(1, 2);
        let err = filter_gamma_dot(&history_refs, current.as_mut(), 3).unwrap_err();
        assert!(matches!(err, AssemblyError::ShapeMismatch { .. }));
    }
}
