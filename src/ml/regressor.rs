use serde::{Deserialize, Serialize};

use super::{
    artifact::ArtifactError,
    check_row,
    encoder::{EncodedRow, FeatureLayout},
    ScoreError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegressorKind {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    Forest {
        trees: Vec<RegressionTree>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    /// Node 0 is the root.
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl RegressionTree {
    fn validate(&self, name: &str, n_features: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::malformed(name, "tree without nodes"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(ArtifactError::malformed(
                        name,
                        format!("node {i} splits on feature {feature} of {n_features}"),
                    ));
                }
                // children always sit after their parent, which rules out cycles
                let in_range = |child: usize| child > i && child < self.nodes.len();
                if !in_range(*left) || !in_range(*right) {
                    return Err(ArtifactError::malformed(
                        name,
                        format!("node {i} has invalid children {left}/{right}"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

impl RegressorKind {
    pub fn validate(&self, name: &str, n_features: usize) -> Result<(), ArtifactError> {
        match self {
            RegressorKind::Linear { coefficients, .. } => {
                if coefficients.len() != n_features {
                    return Err(ArtifactError::malformed(
                        name,
                        format!(
                            "{} coefficients for {} features",
                            coefficients.len(),
                            n_features
                        ),
                    ));
                }
                Ok(())
            }
            RegressorKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(ArtifactError::malformed(name, "forest without trees"));
                }
                trees
                    .iter()
                    .try_for_each(|tree| tree.validate(name, n_features))
            }
        }
    }

    fn score(&self, x: &[f64]) -> f64 {
        match self {
            RegressorKind::Linear {
                intercept,
                coefficients,
            } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(x)
                        .map(|(beta, value)| beta * value)
                        .sum::<f64>()
            }
            RegressorKind::Forest { trees } => {
                trees.iter().map(|tree| tree.predict(x)).sum::<f64>() / trees.len() as f64
            }
        }
    }
}

/// A fitted price regressor together with its input layout.
#[derive(Debug, Clone)]
pub struct PriceModel {
    pub name: String,
    pub layout: FeatureLayout,
    kind: RegressorKind,
}

impl PriceModel {
    pub fn new(name: String, layout: FeatureLayout, kind: RegressorKind) -> Self {
        Self { name, layout, kind }
    }

    pub fn kind(&self) -> &RegressorKind {
        &self.kind
    }

    pub fn predict(&self, row: &EncodedRow) -> Result<f64, ScoreError> {
        check_row(&self.layout, row)?;
        let value = self.kind.score(&row.values);
        if !value.is_finite() {
            return Err(ScoreError::NonFinite(self.name.clone()));
        }
        Ok(value)
    }
}
