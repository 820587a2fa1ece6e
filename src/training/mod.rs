//! Offline training job: fits the sale and rent regressors and the survival
//! model from stored properties, writes the artifacts, and replaces the
//! predictions table with fresh scores for every usable property.

pub mod cox;
pub mod dataset;
pub mod regression;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::{info, warn};
use nalgebra::DVector;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use crate::{
    config::Config,
    db::Store,
    ml::{
        artifact::{write_json, RegressorArtifact, SurvivalArtifact},
        encoder::UnseenCategoryPolicy,
        regressor::RegressorKind,
        Models, PREDICTED_RENT_PRICE, PREDICTED_SALE_PRICE, RENT_MODEL_FILE, SALE_MODEL_FILE,
        SURVIVAL_MODEL_FILE,
    },
    models::prediction::Prediction,
};

use dataset::{design_matrix, fit_layout, TrainingRow};

pub const PREDICTIONS_CSV: &str = "predictions.csv";

const RIDGE: f64 = 1e-3;
const COX_PENALIZER: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub train_rows: usize,
    pub test_rows: usize,
    /// `None` when the holdout is empty.
    pub mae: Option<f64>,
    pub r2: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FittedModels {
    pub sale: RegressorArtifact,
    pub rent: RegressorArtifact,
    pub survival: SurvivalArtifact,
    pub sale_evaluation: Evaluation,
    pub rent_evaluation: Evaluation,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub sale_evaluation: Evaluation,
    pub rent_evaluation: Evaluation,
    pub predictions_written: usize,
}

/// Seeded shuffle split into `(train, test)` index sets. At least one row is
/// always kept for training.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_rows = ((n as f64) * test_size.clamp(0.0, 1.0)).round() as usize;
    let test_rows = test_rows.min(n.saturating_sub(1));
    let train = indices.split_off(test_rows);
    (train, indices)
}

fn fit_price_model(
    name: &str,
    rows: &[TrainingRow],
    target: fn(&TrainingRow) -> Option<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(RegressorArtifact, Evaluation)> {
    let labeled: Vec<(&TrainingRow, f64)> = rows
        .iter()
        .filter_map(|row| target(row).map(|y| (row, y)))
        .collect();
    if labeled.is_empty() {
        return Err(anyhow!("no rows with a known {name}"));
    }

    let (train, test) = train_test_split(labeled.len(), test_size, seed);

    let layout = fit_layout(train.iter().map(|&i| &labeled[i].0.features), &[]);
    let x = design_matrix(
        &layout,
        train.iter().map(|&i| (&labeled[i].0.features, Vec::new())),
    );
    let y = DVector::from_iterator(train.len(), train.iter().map(|&i| labeled[i].1));
    let (intercept, coefficients) = fit_linear_checked(name, &x, &y)?;

    let artifact = RegressorArtifact {
        name: name.to_string(),
        feature_names: Some(layout.feature_names.clone()),
        vocabulary: layout.vocabulary.clone(),
        model: RegressorKind::Linear {
            intercept,
            coefficients,
        },
    };

    let model = artifact.clone().into_model()?;
    let mut actual = Vec::with_capacity(test.len());
    let mut predicted = Vec::with_capacity(test.len());
    for &i in &test {
        let (row, y) = labeled[i];
        // the holdout may hold categories the train split never saw
        let encoded = layout.encode(&row.features, &[], UnseenCategoryPolicy::ZeroFill)?;
        actual.push(y);
        predicted.push(model.predict(&encoded)?);
    }

    let evaluation = Evaluation {
        train_rows: train.len(),
        test_rows: test.len(),
        mae: (!test.is_empty()).then(|| regression::mean_absolute_error(&actual, &predicted)),
        r2: (!test.is_empty()).then(|| regression::r2_score(&actual, &predicted)),
    };
    info!(
        "{name} model: {} train rows, {} test rows, MAE {:?}, R2 {:?}",
        evaluation.train_rows, evaluation.test_rows, evaluation.mae, evaluation.r2
    );

    Ok((artifact, evaluation))
}

fn fit_linear_checked(
    name: &str,
    x: &nalgebra::DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<(f64, Vec<f64>)> {
    regression::fit_linear(x, y, RIDGE).with_context(|| format!("failed to fit {name} model"))
}

/// Fits all three models in memory.
pub fn fit_models(rows: &[TrainingRow], test_size: f64, seed: u64) -> Result<FittedModels> {
    let (sale, sale_evaluation) =
        fit_price_model("sale_price", rows, |r| r.sale_price, test_size, seed)?;
    let (rent, rent_evaluation) =
        fit_price_model("rent_price", rows, |r| r.rent_price, test_size, seed)?;

    let sale_model = sale.clone().into_model()?;
    let rent_model = rent.clone().into_model()?;

    let policy = UnseenCategoryPolicy::ZeroFill;
    let mut priced = Vec::with_capacity(rows.len());
    for row in rows {
        let sale_row = sale_model.layout.encode(&row.features, &[], policy)?;
        let rent_row = rent_model.layout.encode(&row.features, &[], policy)?;
        priced.push((row, sale_model.predict(&sale_row)?, rent_model.predict(&rent_row)?));
    }

    let extra = [PREDICTED_SALE_PRICE, PREDICTED_RENT_PRICE];
    let layout = fit_layout(rows.iter().map(|r| &r.features), &extra);
    let x = design_matrix(
        &layout,
        priced.iter().map(|(row, sale_price, rent_price)| {
            (
                &row.features,
                vec![
                    (PREDICTED_SALE_PRICE, *sale_price),
                    (PREDICTED_RENT_PRICE, *rent_price),
                ],
            )
        }),
    );
    let durations: Vec<f64> = rows.iter().map(|r| r.duration_days).collect();
    let events: Vec<bool> = rows.iter().map(|r| r.sold).collect();
    let cox = cox::fit_cox(&x, &durations, &events, COX_PENALIZER)
        .context("failed to fit survival model")?;

    let survival = SurvivalArtifact {
        name: "survival".to_string(),
        feature_names: Some(layout.feature_names),
        vocabulary: layout.vocabulary,
        model: cox,
    };

    Ok(FittedModels {
        sale,
        rent,
        survival,
        sale_evaluation,
        rent_evaluation,
    })
}

impl FittedModels {
    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create model dir {}", dir.display()))?;
        write_json(&dir.join(SALE_MODEL_FILE), &self.sale)?;
        write_json(&dir.join(RENT_MODEL_FILE), &self.rent)?;
        write_json(&dir.join(SURVIVAL_MODEL_FILE), &self.survival)?;
        info!("Wrote model artifacts to {}", dir.display());
        Ok(())
    }
}

/// Scores every row the way the HTTP service would. Prices are rounded to
/// whole numbers and probabilities to two decimals.
pub fn score_rows(models: &Models, rows: &[TrainingRow], horizon_days: f64) -> Vec<Prediction> {
    let mut predictions = Vec::with_capacity(rows.len());
    for row in rows {
        match models.estimate(&row.features, UnseenCategoryPolicy::ZeroFill, horizon_days) {
            Ok(estimate) => predictions.push(Prediction {
                prediction_id: predictions.len() as i32 + 1,
                property_id: row.property_id,
                predicted_sale_price: estimate.sale_price.round(),
                predicted_rent_price: estimate.rent_price.round(),
                prob_sold_within_5_months: (estimate.prob_sold * 100.0).round() / 100.0,
            }),
            Err(e) => warn!("Could not score property {}: {e}", row.property_id),
        }
    }
    predictions
}

/// Export column order: property first, then the stored prediction fields.
#[derive(Serialize)]
struct PredictionCsvRow {
    property_id: i32,
    prediction_id: i32,
    predicted_sale_price: f64,
    predicted_rent_price: f64,
    prob_sold_within_5_months: f64,
}

impl From<&Prediction> for PredictionCsvRow {
    fn from(p: &Prediction) -> Self {
        PredictionCsvRow {
            property_id: p.property_id,
            prediction_id: p.prediction_id,
            predicted_sale_price: p.predicted_sale_price,
            predicted_rent_price: p.predicted_rent_price,
            prob_sold_within_5_months: p.prob_sold_within_5_months,
        }
    }
}

pub fn write_predictions_csv(dir: &Path, predictions: &[Prediction]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    let path = dir.join(PREDICTIONS_CSV);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for prediction in predictions {
        writer.serialize(PredictionCsvRow::from(prediction))?;
    }
    writer.flush()?;
    info!("Wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}

pub fn run(config: &Config, store: &dyn Store) -> Result<TrainingReport> {
    let today = Local::now().date_naive();
    let properties = store.list_properties()?;
    let locations = store.list_locations()?;
    let rows = dataset::collect_rows(&properties, &locations, today);
    if rows.is_empty() {
        return Err(anyhow!("no usable property rows to train on"));
    }

    let fitted = fit_models(&rows, config.test_size, config.random_seed)?;
    let model_dir = Path::new(&config.model_dir);
    fitted.write(model_dir)?;

    // Reload through the serving loader so stored scores match what the API returns.
    let models = Models::load(model_dir)?;
    let predictions = score_rows(&models, &rows, config.survival_horizon_days);
    write_predictions_csv(Path::new(&config.output_dir), &predictions)?;
    let predictions_written = store.replace_predictions(predictions)?;

    info!("Training run finished: {predictions_written} predictions stored");

    Ok(TrainingReport {
        rows: rows.len(),
        sale_evaluation: fitted.sale_evaluation,
        rent_evaluation: fitted.rent_evaluation,
        predictions_written,
    })
}
