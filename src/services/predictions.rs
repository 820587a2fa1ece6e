use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::Config,
    db::{Store, StoreError},
    ml::{
        encoder::{PropertyFeatures, UnseenCategoryPolicy},
        EstimateError, Models,
    },
};

#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("Property {0} not found")]
    PropertyNotFound(i32),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EstimateError> for PredictionError {
    fn from(err: EstimateError) -> Self {
        PredictionError::InvalidInput(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedPrediction {
    pub property_id: Option<i32>,
    pub predicted_sale_price: f64,
    pub predicted_rent_price: f64,
    pub prob_sold_within_5_months: f64,
}

/// Serves point predictions for stored properties or raw feature payloads.
pub struct PredictionService {
    store: Arc<dyn Store>,
    models: Arc<Models>,
    policy: UnseenCategoryPolicy,
    horizon_days: f64,
}

impl PredictionService {
    pub fn new(store: Arc<dyn Store>, models: Arc<Models>, config: &Config) -> Self {
        Self {
            store,
            models,
            policy: config.unseen_categories,
            horizon_days: config.survival_horizon_days,
        }
    }

    /// Looks up the property and its location's district.
    pub fn features_for(&self, property_id: i32) -> Result<PropertyFeatures, PredictionError> {
        let property = self
            .store
            .get_property(property_id)?
            .ok_or(PredictionError::PropertyNotFound(property_id))?;

        let district = match property.location_id {
            Some(location_id) => self
                .store
                .get_location(location_id)?
                .and_then(|location| location.district),
            None => None,
        };

        property
            .features(district.as_deref())
            .map_err(PredictionError::InvalidInput)
    }

    pub fn predict_sale(&self, property_id: i32) -> Result<PricePrediction, PredictionError> {
        let features = self.features_for(property_id)?;
        let predicted_price = self
            .models
            .sale_price(&features, self.policy)
            .map_err(|e| log_failure("sale", property_id, e))?;
        Ok(PricePrediction { predicted_price })
    }

    pub fn predict_rent(&self, property_id: i32) -> Result<PricePrediction, PredictionError> {
        let features = self.features_for(property_id)?;
        let predicted_price = self
            .models
            .rent_price(&features, self.policy)
            .map_err(|e| log_failure("rent", property_id, e))?;
        Ok(PricePrediction { predicted_price })
    }

    pub fn predict_combined(
        &self,
        property_id: i32,
    ) -> Result<CombinedPrediction, PredictionError> {
        let features = self.features_for(property_id)?;
        let mut prediction = self
            .estimate(&features)
            .map_err(|e| log_failure("combined", property_id, e))?;
        prediction.property_id = Some(property_id);
        info!(
            "Property {property_id}: sale {:.0}, rent {:.0}, p(sold by {} days) {:.3}",
            prediction.predicted_sale_price,
            prediction.predicted_rent_price,
            self.horizon_days,
            prediction.prob_sold_within_5_months
        );
        Ok(prediction)
    }

    pub fn predict_from_features(
        &self,
        features: &PropertyFeatures,
    ) -> Result<CombinedPrediction, PredictionError> {
        Ok(self.estimate(features)?)
    }

    fn estimate(&self, features: &PropertyFeatures) -> Result<CombinedPrediction, EstimateError> {
        let estimate = self
            .models
            .estimate(features, self.policy, self.horizon_days)?;
        Ok(CombinedPrediction {
            property_id: None,
            predicted_sale_price: estimate.sale_price,
            predicted_rent_price: estimate.rent_price,
            prob_sold_within_5_months: estimate.prob_sold,
        })
    }
}

fn log_failure(kind: &str, property_id: i32, err: EstimateError) -> PredictionError {
    error!("{kind} prediction failed for property {property_id}: {err}");
    err.into()
}
