use statrs::distribution::{ContinuousCDF, StudentsT};

use super::StatOutcome;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Pearson correlation of two equally long series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> StatOutcome<f64> {
    let n = xs.len().min(ys.len());
    if let Some(short) = StatOutcome::require(2, n) {
        return short;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (Some(mx), Some(my)) = (mean(xs), mean(ys)) else {
        return StatOutcome::Degenerate;
    };

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return StatOutcome::Degenerate;
    }
    StatOutcome::Value((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Least-squares slope of `ys` against `xs`. `None` with fewer than two
/// points or when every x is the same.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&xs[..n])?;
    let my = mean(&ys[..n])?;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys).take(n) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
    }
    (sxx > 0.0).then(|| sxy / sxx)
}

/// Trailing rolling mean with `min_periods = 1`: the first values average
/// whatever is available.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

// ── Welch's t-test ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    /// Two-sided.
    pub p_value: f64,
}

/// Unequal-variance two-sample t-test. Each sample needs at least
/// `min_samples` (and never fewer than two) observations.
pub fn welch_t_test(a: &[f64], b: &[f64], min_samples: usize) -> StatOutcome<WelchTest> {
    let required = min_samples.max(2);
    if let Some(short) = StatOutcome::require(required, a.len().min(b.len())) {
        return short;
    }
    let (Some(ma), Some(mb), Some(va), Some(vb)) =
        (mean(a), mean(b), sample_variance(a), sample_variance(b))
    else {
        return StatOutcome::Degenerate;
    };

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (sa, sb) = (va / na, vb / nb);
    let se2 = sa + sb;
    if se2 == 0.0 {
        return StatOutcome::Degenerate;
    }

    let t = (ma - mb) / se2.sqrt();
    let df = se2.powi(2) / (sa.powi(2) / (na - 1.0) + sb.powi(2) / (nb - 1.0));
    let Some(p_value) = student_t_two_sided_p(t, df) else {
        return StatOutcome::Degenerate;
    };
    StatOutcome::Value(WelchTest {
        t_statistic: t,
        degrees_of_freedom: df,
        p_value,
    })
}

/// Two-sided p-value of Student's t distribution. `None` for a
/// non-positive or non-finite `df`.
pub fn student_t_two_sided_p(t: f64, df: f64) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn mean_and_variance() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sample_variance(&[1.0]), None);
        assert_eq!(sample_variance(&[1.0, 2.0, 3.0]), Some(1.0));
    }

    #[test]
    fn pearson_perfect_and_degenerate() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(is_close!(pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).value().unwrap(), 1.0));
        assert!(is_close!(pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).value().unwrap(), -1.0));
        assert_eq!(pearson(&xs, &[5.0; 4]), StatOutcome::Degenerate);
        assert_eq!(
            pearson(&[1.0], &[1.0]),
            StatOutcome::InsufficientData { required: 2, available: 1 }
        );
    }

    #[test]
    fn slope_of_a_line() {
        assert!(is_close!(linear_slope(&[2000.0, 2001.0, 2002.0], &[10.0, 8.0, 6.0]).unwrap(), -2.0));
        assert_eq!(linear_slope(&[2000.0], &[1.0]), None);
        assert_eq!(linear_slope(&[2000.0, 2000.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn rolling_mean_uses_partial_windows() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![1.0, 1.5, 2.0, 3.0]);
        assert_eq!(rolling_mean(&[], 5), Vec::<f64>::new());
    }

    #[test]
    fn student_t_p_values() {
        assert!(close(student_t_two_sided_p(0.0, 10.0).unwrap(), 1.0));
        // Cauchy: P(|T| > 1) = 0.5
        assert!(close(student_t_two_sided_p(1.0, 1.0).unwrap(), 0.5));
        // df = 2 has a closed form: 1 - t / sqrt(t^2 + 2)
        assert!(close(student_t_two_sided_p(2.0, 2.0).unwrap(), 1.0 - 2.0 / 6f64.sqrt()));
        assert!(close(student_t_two_sided_p(-2.0, 2.0).unwrap(), 1.0 - 2.0 / 6f64.sqrt()));
        assert_eq!(student_t_two_sided_p(1.0, 0.0), None);
    }

    #[test]
    fn welch_detects_a_shift() {
        let pre = [10.0, 11.0, 12.0, 11.0];
        let post = [5.0, 6.0, 5.5, 6.5];
        let test = welch_t_test(&pre, &post, 3).value().unwrap();
        assert!(test.t_statistic > 0.0);
        assert!(test.p_value < 0.01);
    }

    #[test]
    fn welch_requires_samples_and_spread() {
        assert_eq!(
            welch_t_test(&[1.0, 2.0], &[1.0, 2.0, 3.0], 3),
            StatOutcome::InsufficientData { required: 3, available: 2 }
        );
        assert_eq!(welch_t_test(&[1.0; 3], &[1.0; 3], 3), StatOutcome::Degenerate);
    }
}
