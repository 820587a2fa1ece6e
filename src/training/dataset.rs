use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use log::{debug, info};
use nalgebra::DMatrix;

use crate::{
    ml::encoder::{
        indicator_name, one_hot_row, reindex, FeatureLayout, PropertyFeatures, Vocabulary,
        CATEGORICAL_FEATURES, NUMERIC_FEATURES,
    },
    models::{location::Location, property::Property},
};

/// A property with complete model inputs and its observed outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub property_id: i32,
    pub features: PropertyFeatures,
    /// Days from posting until sale, or until `today` while still listed.
    pub duration_days: f64,
    /// Whether the sale was observed.
    pub sold: bool,
    pub sale_price: Option<f64>,
    pub rent_price: Option<f64>,
}

pub fn collect_rows(
    properties: &[Property],
    locations: &[Location],
    today: NaiveDate,
) -> Vec<TrainingRow> {
    let districts: HashMap<i32, &str> = locations
        .iter()
        .filter_map(|l| l.district.as_deref().map(|d| (l.location_id, d)))
        .collect();

    let rows: Vec<TrainingRow> = properties
        .iter()
        .filter_map(|property| {
            let district = property
                .location_id
                .and_then(|id| districts.get(&id).copied());
            let features = match property.features(district) {
                Ok(f) => f,
                Err(reason) => {
                    debug!("Skipping training row: {reason}");
                    return None;
                }
            };
            let end = property.sell_date.unwrap_or(today);
            let duration_days = (end - property.post_date).num_days().max(0) as f64;

            Some(TrainingRow {
                property_id: property.property_id,
                features,
                duration_days,
                sold: property.sell_date.is_some(),
                sale_price: property.estimated_saleprice,
                rent_price: property.estimated_rentprice,
            })
        })
        .collect();

    info!(
        "Collected {} training rows from {} properties",
        rows.len(),
        properties.len()
    );
    rows
}

/// Builds the training-time layout: numeric columns, `extra` covariates, then
/// one indicator per category with the first (sorted) category of each column
/// dropped as the baseline.
pub fn fit_layout<'a>(
    features: impl IntoIterator<Item = &'a PropertyFeatures>,
    extra: &[&str],
) -> FeatureLayout {
    let mut seen: [BTreeSet<String>; 2] = Default::default();
    for f in features {
        for (i, (_, value)) in f.categorical().iter().enumerate() {
            seen[i].insert(value.to_string());
        }
    }

    let mut feature_names: Vec<String> =
        NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
    feature_names.extend(extra.iter().map(|s| s.to_string()));

    let mut vocabulary = Vocabulary::new();
    for (column, values) in CATEGORICAL_FEATURES.iter().zip(seen) {
        let values: Vec<String> = values.into_iter().collect();
        feature_names.extend(values.iter().skip(1).map(|v| indicator_name(column, v)));
        vocabulary.insert(column.to_string(), values);
    }

    FeatureLayout::new(feature_names, vocabulary)
}

/// One encoded row per input, aligned to `layout`.
pub fn design_matrix<'a>(
    layout: &FeatureLayout,
    rows: impl IntoIterator<Item = (&'a PropertyFeatures, Vec<(&'a str, f64)>)>,
) -> DMatrix<f64> {
    let encoded: Vec<Vec<f64>> = rows
        .into_iter()
        .map(|(features, extra)| {
            reindex(&one_hot_row(features, &extra), &layout.feature_names).values
        })
        .collect();

    DMatrix::from_fn(encoded.len(), layout.feature_names.len(), |i, j| {
        encoded[i][j]
    })
}
