//! On-disk model artifacts.
//!
//! Every artifact is a JSON document carrying the feature names the model was
//! fit on, the categorical vocabulary (optional) and the fitted parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    encoder::{FeatureLayout, Vocabulary},
    regressor::{PriceModel, RegressorKind},
    survival::{CoxPh, SurvivalModel},
};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse model artifact {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("model artifact {0} has no recorded feature names")]
    MissingFeatureNames(String),
    #[error("model artifact {name} is malformed: {reason}")]
    Malformed { name: String, reason: String },
}

impl ArtifactError {
    pub fn malformed(name: &str, reason: impl Into<String>) -> Self {
        ArtifactError::Malformed {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressorArtifact {
    pub name: String,
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    pub model: RegressorKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalArtifact {
    pub name: String,
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    pub model: CoxPh,
}

fn layout(
    name: &str,
    feature_names: Option<Vec<String>>,
    vocabulary: Vocabulary,
) -> Result<FeatureLayout, ArtifactError> {
    let feature_names =
        feature_names.ok_or_else(|| ArtifactError::MissingFeatureNames(name.to_string()))?;
    if feature_names.is_empty() {
        return Err(ArtifactError::MissingFeatureNames(name.to_string()));
    }
    Ok(FeatureLayout::new(feature_names, vocabulary))
}

impl RegressorArtifact {
    pub fn into_model(self) -> Result<PriceModel, ArtifactError> {
        let layout = layout(&self.name, self.feature_names, self.vocabulary)?;
        self.model.validate(&self.name, layout.feature_names.len())?;
        Ok(PriceModel::new(self.name, layout, self.model))
    }
}

impl SurvivalArtifact {
    pub fn into_model(self) -> Result<SurvivalModel, ArtifactError> {
        let layout = layout(&self.name, self.feature_names, self.vocabulary)?;
        self.model.validate(&self.name, layout.feature_names.len())?;
        Ok(SurvivalModel::new(self.name, layout, self.model))
    }
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ArtifactError> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: display,
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, artifact: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, artifact)?;
    Ok(())
}
