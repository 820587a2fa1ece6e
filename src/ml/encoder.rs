//! One-row feature encoding.
//!
//! A property is turned into numeric passthrough columns plus one indicator
//! column per categorical value (`<column>_<value>`), then reindexed onto the
//! column list a trained model recorded at fit time.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NUMERIC_FEATURES: [&str; 4] = ["size_sqm", "rooms", "floor", "year_built"];
pub const CATEGORICAL_FEATURES: [&str; 2] = ["district", "renovation_status"];

/// Category values seen during training, per categorical column.
pub type Vocabulary = BTreeMap<String, Vec<String>>;

/// Raw model inputs for a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFeatures {
    pub size_sqm: f64,
    pub rooms: i32,
    pub floor: i32,
    pub year_built: i32,
    pub district: String,
    pub renovation_status: String,
}

impl PropertyFeatures {
    pub fn numeric(&self) -> [(&'static str, f64); 4] {
        [
            ("size_sqm", self.size_sqm),
            ("rooms", self.rooms as f64),
            ("floor", self.floor as f64),
            ("year_built", self.year_built as f64),
        ]
    }

    pub fn categorical(&self) -> [(&'static str, &str); 2] {
        [
            ("district", self.district.as_str()),
            ("renovation_status", self.renovation_status.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    /// Fail the request with a validation error.
    #[default]
    Reject,
    /// Encode the value as all-zero indicators.
    ZeroFill,
}

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("{column} value '{value}' was not seen during training")]
    UnseenCategory { column: String, value: String },
}

/// Column layout a trained model expects.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    pub feature_names: Vec<String>,
    pub vocabulary: Vocabulary,
}

/// A single row aligned to a [`FeatureLayout`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl EncodedRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

pub fn indicator_name(column: &str, value: &str) -> String {
    format!("{column}_{value}")
}

/// Expands a property into `(column, value)` pairs, one indicator per
/// categorical value present in this row. `extra` numeric covariates are
/// appended unchanged.
pub fn one_hot_row(features: &PropertyFeatures, extra: &[(&str, f64)]) -> Vec<(String, f64)> {
    let mut row: Vec<(String, f64)> = features
        .numeric()
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();

    for (column, value) in features.categorical() {
        row.push((indicator_name(column, value), 1.0));
    }

    for (name, value) in extra {
        row.push((name.to_string(), *value));
    }

    row
}

/// Reorders `row` onto `expected`. Missing columns become 0, unexpected
/// columns are dropped.
pub fn reindex(row: &[(String, f64)], expected: &[String]) -> EncodedRow {
    let values = expected
        .iter()
        .map(|name| {
            row.iter()
                .find(|(column, _)| column == name)
                .map(|(_, value)| *value)
                .unwrap_or(0.0)
        })
        .collect();

    EncodedRow {
        columns: expected.to_vec(),
        values,
    }
}

impl FeatureLayout {
    pub fn new(feature_names: Vec<String>, vocabulary: Vocabulary) -> Self {
        Self {
            feature_names,
            vocabulary,
        }
    }

    fn check_vocabulary(
        &self,
        features: &PropertyFeatures,
        policy: UnseenCategoryPolicy,
    ) -> Result<(), EncodeError> {
        for (column, value) in features.categorical() {
            let Some(known) = self.vocabulary.get(column) else {
                continue;
            };
            if known.iter().any(|k| k == value) {
                continue;
            }
            match policy {
                UnseenCategoryPolicy::Reject => {
                    return Err(EncodeError::UnseenCategory {
                        column: column.to_string(),
                        value: value.to_string(),
                    })
                }
                UnseenCategoryPolicy::ZeroFill => {
                    warn!("{column} value '{value}' unseen in training, encoding as all zeros")
                }
            }
        }
        Ok(())
    }

    pub fn encode(
        &self,
        features: &PropertyFeatures,
        extra: &[(&str, f64)],
        policy: UnseenCategoryPolicy,
    ) -> Result<EncodedRow, EncodeError> {
        self.check_vocabulary(features, policy)?;
        let row = one_hot_row(features, extra);
        Ok(reindex(&row, &self.feature_names))
    }
}
