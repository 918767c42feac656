use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const CONTINUED_FRACTION_ITERATIONS: usize = 300;
const CONTINUED_FRACTION_EPSILON: f64 = 1e-14;
const TINY: f64 = 1e-300;

/// Ordinary least squares fit of `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub standard_error: f64,
    pub p_value: f64,
    pub observations: usize,
}

/// Fits a simple linear regression.
///
/// Returns `None` for fewer than three points or when `x` has no variance,
/// since neither the slope nor its t-statistic is defined then.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<Regression> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    let x = &x[..n];
    let y = &y[..n];

    let mean_x = mean(x);
    let mean_y = mean(y);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= f64::EPSILON * n as f64 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let ss_residual = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let residual = yi - (intercept + slope * xi);
            residual * residual
        })
        .sum::<f64>();
    let r_squared = if syy > 0.0 {
        (1.0 - ss_residual / syy).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let degrees_of_freedom = (n - 2) as f64;
    let standard_error = (ss_residual / degrees_of_freedom / sxx).sqrt();
    let p_value = if standard_error > 0.0 {
        student_t_two_tailed_p(slope / standard_error, degrees_of_freedom)
    } else if slope != 0.0 {
        0.0
    } else {
        1.0
    };

    Some(Regression {
        slope,
        intercept,
        r_squared,
        standard_error,
        p_value,
        observations: n,
    })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let center = mean(values);
    let squares = values
        .iter()
        .map(|value| (value - center) * (value - center))
        .sum::<f64>();
    (squares / (values.len() - 1) as f64).sqrt()
}

/// `P(|T| >= |t|)` for Student's t with `degrees_of_freedom`.
pub fn student_t_two_tailed_p(t: f64, degrees_of_freedom: f64) -> f64 {
    if t.is_nan() || degrees_of_freedom <= 0.0 {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = degrees_of_freedom / (degrees_of_freedom + t * t);
    regularized_incomplete_beta(degrees_of_freedom / 2.0, 0.5, x).clamp(0.0, 1.0)
}

pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    // The continued fraction converges fastest below this point; use the
    // symmetry I_x(a, b) = 1 - I_(1-x)(b, a) above it.
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

// Modified Lentz evaluation.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = guard(1.0 - qab * x / qap).recip();
    let mut h = d;

    for step in 1..=CONTINUED_FRACTION_ITERATIONS {
        let m = step as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = guard(1.0 + even * d).recip();
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = guard(1.0 + odd * d).recip();
        c = guard(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < CONTINUED_FRACTION_EPSILON {
            break;
        }
    }
    h
}

fn guard(value: f64) -> f64 {
    if value.abs() < TINY { TINY } else { value }
}

/// Natural log of the gamma function for positive arguments (Lanczos).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let shifted = x - 1.0;
    let mut series = LANCZOS_COEFFICIENTS[0];
    for (index, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        series += coefficient / (shifted + index as f64);
    }
    let t = shifted + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (shifted + 0.5) * t.ln() - t + series.ln()
}

#[cfg(test)]
mod tests {
    use super::{
        linear_regression, ln_gamma, regularized_incomplete_beta, sample_std_dev,
        student_t_two_tailed_p,
    };

    fn close(left: f64, right: f64, tolerance: f64) -> bool {
        (left - right).abs() < tolerance
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(close(ln_gamma(1.0), 0.0, 1e-12));
        assert!(close(ln_gamma(5.0), 24.0_f64.ln(), 1e-12));
        assert!(close(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), 1e-12));
    }

    #[test]
    fn incomplete_beta_edges_and_symmetry() {
        assert!(close(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0, 1e-15));
        assert!(close(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0, 1e-15));
        // I_x(1, 1) is the uniform CDF
        assert!(close(regularized_incomplete_beta(1.0, 1.0, 0.3), 0.3, 1e-12));
        let left = regularized_incomplete_beta(2.5, 4.0, 0.35);
        let right = 1.0 - regularized_incomplete_beta(4.0, 2.5, 0.65);
        assert!(close(left, right, 1e-12));
    }

    #[test]
    fn student_t_p_values_match_reference_tables() {
        // Cauchy: P(|T| > 1) = 0.5
        assert!(close(student_t_two_tailed_p(1.0, 1.0), 0.5, 1e-10));
        assert!(close(student_t_two_tailed_p(2.228_138_851_986_273, 10.0), 0.05, 1e-6));
        assert!(close(student_t_two_tailed_p(-2.228_138_851_986_273, 10.0), 0.05, 1e-6));
        assert!(close(student_t_two_tailed_p(0.0, 4.0), 1.0, 1e-12));
    }

    #[test]
    fn regression_recovers_slope_fit_and_significance() {
        let fitted = linear_regression(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]);
        assert!(fitted.is_some());
        if let Some(regression) = fitted {
            assert!(close(regression.slope, 0.6, 1e-12));
            assert!(close(regression.intercept, 2.2, 1e-12));
            assert!(close(regression.r_squared, 0.6, 1e-12));
            assert!(close(regression.p_value, 0.124_027_4, 1e-5));
        }

        let exact = linear_regression(&[0.1, -0.2, 0.3], &[-0.12, 0.24, -0.36]);
        assert!(exact.is_some());
        if let Some(regression) = exact {
            assert!(close(regression.slope, -1.2, 1e-12));
            assert!(close(regression.r_squared, 1.0, 1e-12));
            assert!(regression.p_value < 1e-6);
        }
    }

    #[test]
    fn regression_rejects_degenerate_inputs() {
        assert!(linear_regression(&[1.0, 2.0], &[3.0, 4.0]).is_none());
        assert!(linear_regression(&[2.0, 2.0, 2.0], &[1.0, 5.0, 9.0]).is_none());
    }

    #[test]
    fn sample_std_dev_uses_bessel_correction() {
        assert!(close(sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138_089_935, 1e-9));
        assert!(close(sample_std_dev(&[3.0]), 0.0, 1e-15));
    }
}
