use anyhow::{anyhow, Result};
use nalgebra::{DMatrix, DVector};

/// Column means and standard deviations. Constant columns get a deviation of
/// 1 so they standardize to zero instead of dividing by zero.
pub fn column_stats(x: &DMatrix<f64>) -> (DVector<f64>, DVector<f64>) {
    let n = x.nrows().max(1) as f64;
    let means = DVector::from_fn(x.ncols(), |j, _| x.column(j).sum() / n);
    let stds = DVector::from_fn(x.ncols(), |j, _| {
        let var = x.column(j).iter().map(|v| (v - means[j]).powi(2)).sum::<f64>() / n;
        if var > f64::EPSILON {
            var.sqrt()
        } else {
            1.0
        }
    });
    (means, stds)
}

pub fn standardize(x: &DMatrix<f64>, means: &DVector<f64>, stds: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| (x[(i, j)] - means[j]) / stds[j])
}

/// Ridge-stabilised least squares. Returns `(intercept, coefficients)` on the
/// original feature scale; the intercept is not penalised.
pub fn fit_linear(x: &DMatrix<f64>, y: &DVector<f64>, ridge: f64) -> Result<(f64, Vec<f64>)> {
    if x.nrows() == 0 {
        return Err(anyhow!("cannot fit a regression on zero rows"));
    }
    if x.nrows() != y.len() {
        return Err(anyhow!(
            "design matrix has {} rows but target has {}",
            x.nrows(),
            y.len()
        ));
    }

    let (means, stds) = column_stats(x);
    let z = standardize(x, &means, &stds);
    let y_mean = y.mean();
    let y_centered = y.map(|v| v - y_mean);

    let gram = z.transpose() * &z + DMatrix::<f64>::identity(x.ncols(), x.ncols()) * ridge;
    let rhs = z.transpose() * y_centered;
    let beta_std = gram
        .cholesky()
        .ok_or_else(|| anyhow!("normal equations are not positive definite"))?
        .solve(&rhs);

    let coefficients: Vec<f64> = beta_std
        .iter()
        .zip(stds.iter())
        .map(|(b, s)| b / s)
        .collect();
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(means.iter())
            .map(|(b, m)| b * m)
            .sum::<f64>();

    Ok((intercept, coefficients))
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len().max(1) as f64
}

/// Coefficient of determination. A constant target scores 0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len().max(1) as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}
