use serde::{Deserialize, Serialize};

use super::{
    artifact::ArtifactError,
    check_row,
    encoder::{EncodedRow, FeatureLayout},
    ScoreError,
};

/// Fitted Cox proportional-hazards parameters.
///
/// `S(t | x) = S0(t) ^ exp((x - means) . coefficients)`, with `S0` the
/// baseline survival step function evaluated at the covariate means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoxPh {
    pub coefficients: Vec<f64>,
    pub means: Vec<f64>,
    /// `(time, survival)` pairs, ascending in time.
    pub baseline_survival: Vec<(f64, f64)>,
}

impl CoxPh {
    pub fn validate(&self, name: &str, n_features: usize) -> Result<(), ArtifactError> {
        if self.coefficients.len() != n_features || self.means.len() != n_features {
            return Err(ArtifactError::malformed(
                name,
                format!(
                    "{} coefficients and {} means for {} features",
                    self.coefficients.len(),
                    self.means.len(),
                    n_features
                ),
            ));
        }
        if self.baseline_survival.is_empty() {
            return Err(ArtifactError::malformed(name, "empty baseline survival"));
        }
        if self
            .baseline_survival
            .windows(2)
            .any(|w| w[1].0 < w[0].0 || w[1].1 > w[0].1)
        {
            return Err(ArtifactError::malformed(
                name,
                "baseline survival must be ordered by time and non-increasing",
            ));
        }
        if self
            .baseline_survival
            .iter()
            .any(|(_, s)| !(0.0..=1.0).contains(s))
        {
            return Err(ArtifactError::malformed(
                name,
                "baseline survival outside [0, 1]",
            ));
        }
        Ok(())
    }

    /// Right-continuous step lookup, 1.0 before the first recorded time.
    pub fn baseline_at(&self, t: f64) -> f64 {
        self.baseline_survival
            .iter()
            .take_while(|(time, _)| *time <= t)
            .last()
            .map(|(_, s)| *s)
            .unwrap_or(1.0)
    }

    pub fn partial_hazard(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(&self.means)
            .zip(x)
            .map(|((beta, mean), value)| beta * (value - mean))
            .sum::<f64>()
            .exp()
    }

    pub fn survival_at(&self, x: &[f64], t: f64) -> f64 {
        self.baseline_at(t).powf(self.partial_hazard(x))
    }
}

#[derive(Debug, Clone)]
pub struct SurvivalModel {
    pub name: String,
    pub layout: FeatureLayout,
    cox: CoxPh,
}

impl SurvivalModel {
    pub fn new(name: String, layout: FeatureLayout, cox: CoxPh) -> Self {
        Self { name, layout, cox }
    }

    pub fn cox(&self) -> &CoxPh {
        &self.cox
    }

    pub fn survival_at(&self, row: &EncodedRow, t: f64) -> Result<f64, ScoreError> {
        check_row(&self.layout, row)?;
        let survival = self.cox.survival_at(&row.values, t);
        if survival.is_nan() {
            return Err(ScoreError::NonFinite(self.name.clone()));
        }
        Ok(survival.clamp(0.0, 1.0))
    }

    /// Probability the event has happened by `t`, i.e. `1 - S(t)`.
    pub fn event_probability(&self, row: &EncodedRow, t: f64) -> Result<f64, ScoreError> {
        self.survival_at(row, t).map(|s| 1.0 - s)
    }
}
