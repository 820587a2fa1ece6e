pub mod artifact;
pub mod encoder;
pub mod regressor;
pub mod survival;

use std::path::Path;

use log::info;
use thiserror::Error;

use artifact::{read_json, ArtifactError, RegressorArtifact, SurvivalArtifact};
use encoder::{EncodeError, EncodedRow, FeatureLayout, PropertyFeatures, UnseenCategoryPolicy};
use regressor::PriceModel;
use survival::SurvivalModel;

pub const SALE_MODEL_FILE: &str = "sale_price_model.json";
pub const RENT_MODEL_FILE: &str = "rent_price_model.json";
pub const SURVIVAL_MODEL_FILE: &str = "cox_model.json";

/// Extra covariates the survival model consumes on top of the property features.
pub const PREDICTED_SALE_PRICE: &str = "predicted_sale_price";
pub const PREDICTED_RENT_PRICE: &str = "predicted_rent_price";

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("row columns {actual:?} do not match model features {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("column '{0}' is not a finite number")]
    NonNumeric(String),
    #[error("model {0} produced a non-finite score")]
    NonFinite(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}

pub(crate) fn check_row(layout: &FeatureLayout, row: &EncodedRow) -> Result<(), ScoreError> {
    if row.columns != layout.feature_names || row.values.len() != row.columns.len() {
        return Err(ScoreError::ColumnMismatch {
            expected: layout.feature_names.clone(),
            actual: row.columns.clone(),
        });
    }
    if let Some(i) = row.values.iter().position(|v| !v.is_finite()) {
        return Err(ScoreError::NonNumeric(row.columns[i].clone()));
    }
    Ok(())
}

/// Sale and rent estimates plus the probability of selling by the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub sale_price: f64,
    pub rent_price: f64,
    pub prob_sold: f64,
}

/// The three fitted estimators, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct Models {
    pub sale: PriceModel,
    pub rent: PriceModel,
    pub survival: SurvivalModel,
}

impl Models {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let sale = read_json::<RegressorArtifact>(&dir.join(SALE_MODEL_FILE))?.into_model()?;
        let rent = read_json::<RegressorArtifact>(&dir.join(RENT_MODEL_FILE))?.into_model()?;
        let survival =
            read_json::<SurvivalArtifact>(&dir.join(SURVIVAL_MODEL_FILE))?.into_model()?;

        info!(
            "Loaded models from {}: sale ({} features), rent ({} features), survival ({} features)",
            dir.display(),
            sale.layout.feature_names.len(),
            rent.layout.feature_names.len(),
            survival.layout.feature_names.len()
        );

        Ok(Models {
            sale,
            rent,
            survival,
        })
    }

    pub fn sale_price(
        &self,
        features: &PropertyFeatures,
        policy: UnseenCategoryPolicy,
    ) -> Result<f64, EstimateError> {
        let row = self.sale.layout.encode(features, &[], policy)?;
        Ok(self.sale.predict(&row)?)
    }

    pub fn rent_price(
        &self,
        features: &PropertyFeatures,
        policy: UnseenCategoryPolicy,
    ) -> Result<f64, EstimateError> {
        let row = self.rent.layout.encode(features, &[], policy)?;
        Ok(self.rent.predict(&row)?)
    }

    /// Runs sale, then rent, then survival with both prices as covariates.
    pub fn estimate(
        &self,
        features: &PropertyFeatures,
        policy: UnseenCategoryPolicy,
        horizon_days: f64,
    ) -> Result<Estimate, EstimateError> {
        let sale_price = self.sale_price(features, policy)?;
        let rent_price = self.rent_price(features, policy)?;

        let row = self.survival.layout.encode(
            features,
            &[
                (PREDICTED_SALE_PRICE, sale_price),
                (PREDICTED_RENT_PRICE, rent_price),
            ],
            policy,
        )?;
        let prob_sold = self.survival.event_probability(&row, horizon_days)?;

        Ok(Estimate {
            sale_price,
            rent_price,
            prob_sold,
        })
    }
}
