//! Model artifact loading and inference
//!
//! The offline trainer exports its fitted pipeline (standard scaler plus a
//! linear or random-forest regressor) as a JSON artifact. This module loads
//! that blob and exposes the only contract the serving core needs:
//! `predict(ordered feature vector) -> log-space scalar`. Inverting the
//! target transform is the prediction service's job, not the model's.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found at {0}")]
    NotFound(String),

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed model artifact: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("artifact feature columns {artifact:?} do not match the serving encoder")]
    FeatureMismatch { artifact: Vec<String> },

    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

/// Capability the serving core requires from a trained predictor.
///
/// Output is in `log1p` target space, exactly as the regressor was fitted.
pub trait BodModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// Standard-scaler parameters fitted during training
#[derive(Debug, Clone, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    fn transform(&self, features: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.as_array().iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        scaled
    }
}

/// One node of a flattened regression tree. Split children refer to later
/// indices in the tree's node array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
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

/// Regressor kind, tagged by the trainer's `model_type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelKind {
    /// Scaled dot product plus intercept
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Mean over flattened regression trees
    Forest {
        trees: Vec<Vec<TreeNode>>,
    },
}

/// Deserialized trainer export: feature contract, scaler, regressor
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub scaler: Scaler,
    #[serde(flatten)]
    pub kind: ModelKind,
}

impl ModelArtifact {
    /// Validate the feature contract and internal shapes. Called once at
    /// load time so inference itself never has to bounds-check.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names != FEATURE_LAYOUT {
            return Err(ModelError::FeatureMismatch {
                artifact: self.feature_names.clone(),
            });
        }

        if self.scaler.mean.len() != FEATURE_COUNT || self.scaler.scale.len() != FEATURE_COUNT {
            return Err(ModelError::Invalid(format!(
                "scaler expects {} features, artifact has mean={} scale={}",
                FEATURE_COUNT,
                self.scaler.mean.len(),
                self.scaler.scale.len()
            )));
        }
        if self.scaler.scale.iter().any(|s| *s == 0.0) {
            return Err(ModelError::Invalid("scaler contains a zero scale".to_string()));
        }

        match &self.kind {
            ModelKind::Linear { coefficients, .. } => {
                if coefficients.len() != FEATURE_COUNT {
                    return Err(ModelError::Invalid(format!(
                        "expected {} coefficients, artifact has {}",
                        FEATURE_COUNT,
                        coefficients.len()
                    )));
                }
            }
            ModelKind::Forest { trees } => {
                if trees.is_empty() {
                    return Err(ModelError::Invalid("forest has no trees".to_string()));
                }
                for (t, nodes) in trees.iter().enumerate() {
                    validate_tree(t, nodes)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_tree(index: usize, nodes: &[TreeNode]) -> Result<(), ModelError> {
    if nodes.is_empty() {
        return Err(ModelError::Invalid(format!("tree {} is empty", index)));
    }
    for (n, node) in nodes.iter().enumerate() {
        if let TreeNode::Split { feature, left, right, .. } = node {
            if *feature >= FEATURE_COUNT {
                return Err(ModelError::Invalid(format!(
                    "tree {} node {} splits on unknown feature {}",
                    index, n, feature
                )));
            }
            // Children must point forward so traversal always terminates.
            if *left <= n || *right <= n || *left >= nodes.len() || *right >= nodes.len() {
                return Err(ModelError::Invalid(format!(
                    "tree {} node {} has out-of-range children ({}, {})",
                    index, n, left, right
                )));
            }
        }
    }
    Ok(())
}

fn eval_tree(nodes: &[TreeNode], scaled: &[f64; FEATURE_COUNT]) -> f64 {
    let mut index = 0;
    loop {
        match &nodes[index] {
            TreeNode::Leaf { value } => return *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                index = if scaled[*feature] <= *threshold { *left } else { *right };
            }
        }
    }
}

impl BodModel for ModelArtifact {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(features);
        match &self.kind {
            ModelKind::Linear {
                coefficients,
                intercept,
            } => {
                scaled
                    .iter()
                    .zip(coefficients.iter())
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + intercept
            }
            ModelKind::Forest { trees } => {
                let sum: f64 = trees.iter().map(|tree| eval_tree(tree, &scaled)).sum();
                sum / trees.len() as f64
            }
        }
    }
}

/// Load and validate the model artifact. Runs once at startup; the server
/// refuses to start without a usable model.
pub fn load_model(path: impl AsRef<Path>) -> Result<ModelArtifact, ModelError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ModelError::NotFound(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(path)?;
    let artifact: ModelArtifact = serde_json::from_str(&raw)?;
    artifact.validate()?;

    tracing::info!(
        "Model artifact loaded from {} ({} features)",
        path.display(),
        artifact.feature_names.len()
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_scaler() -> String {
        format!(
            r#""scaler": {{"mean": {:?}, "scale": {:?}}}"#,
            [0.0; FEATURE_COUNT],
            [1.0; FEATURE_COUNT]
        )
    }

    fn feature_names_json() -> String {
        serde_json::to_string(&FEATURE_LAYOUT).unwrap()
    }

    fn linear_artifact(coefficients: [f64; FEATURE_COUNT], intercept: f64) -> ModelArtifact {
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": {},
                {},
                "coefficients": {:?},
                "intercept": {}
            }}"#,
            feature_names_json(),
            identity_scaler(),
            coefficients,
            intercept
        );
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_linear_predict() {
        let artifact = linear_artifact([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2.0);
        artifact.validate().unwrap();

        let raw = artifact.predict(&FeatureVector([3.0, 7.0, 1500.0, 300.0, 0.5, 0.5]));
        assert!((raw - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_predict_applies_scaler() {
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": {},
                "scaler": {{"mean": [10, 0, 0, 0, 0, 0], "scale": [2, 1, 1, 1, 1, 1]}},
                "coefficients": [1, 0, 0, 0, 0, 0],
                "intercept": 0
            }}"#,
            feature_names_json()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        artifact.validate().unwrap();

        // (14 - 10) / 2 = 2
        let out = artifact.predict(&FeatureVector([14.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!((out - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_predict_averages_trees() {
        let raw = format!(
            r#"{{
                "model_type": "forest",
                "feature_names": {},
                {},
                "trees": [
                    [
                        {{"feature": 3, "threshold": 100.0, "left": 1, "right": 2}},
                        {{"value": 4.0}},
                        {{"value": 6.0}}
                    ],
                    [
                        {{"value": 5.0}}
                    ]
                ]
            }}"#,
            feature_names_json(),
            identity_scaler()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        artifact.validate().unwrap();

        // cod=50 goes left: (4.0 + 5.0) / 2
        let low = artifact.predict(&FeatureVector([0.0, 0.0, 0.0, 50.0, 0.0, 0.0]));
        assert!((low - 4.5).abs() < 1e-12);

        // cod=500 goes right: (6.0 + 5.0) / 2
        let high = artifact.predict(&FeatureVector([0.0, 0.0, 0.0, 500.0, 0.0, 0.0]));
        assert!((high - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_feature_mismatch() {
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": ["flow", "ph", "conductivity", "cod", "sin_month", "cos_month"],
                {},
                "coefficients": [0, 0, 0, 0, 0, 0],
                "intercept": 0
            }}"#,
            identity_scaler()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        assert!(matches!(
            artifact.validate(),
            Err(ModelError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wrong_coefficient_count() {
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": {},
                {},
                "coefficients": [1, 2, 3],
                "intercept": 0
            }}"#,
            feature_names_json(),
            identity_scaler()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        assert!(matches!(artifact.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_scale() {
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": {},
                "scaler": {{"mean": [0, 0, 0, 0, 0, 0], "scale": [1, 1, 0, 1, 1, 1]}},
                "coefficients": [0, 0, 0, 0, 0, 0],
                "intercept": 0
            }}"#,
            feature_names_json()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        assert!(matches!(artifact.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_backward_tree_edge() {
        let raw = format!(
            r#"{{
                "model_type": "forest",
                "feature_names": {},
                {},
                "trees": [
                    [
                        {{"feature": 0, "threshold": 1.0, "left": 0, "right": 1}},
                        {{"value": 1.0}}
                    ]
                ]
            }}"#,
            feature_names_json(),
            identity_scaler()
        );
        let artifact: ModelArtifact = serde_json::from_str(&raw).unwrap();
        assert!(matches!(artifact.validate(), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn test_load_model_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_load_model_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bod_predictor.json");
        let raw = format!(
            r#"{{
                "model_type": "linear",
                "feature_names": {},
                {},
                "coefficients": [0, 0, 0, 0, 0, 0],
                "intercept": 4.6
            }}"#,
            feature_names_json(),
            identity_scaler()
        );
        std::fs::write(&path, raw).unwrap();

        let artifact = load_model(&path).unwrap();
        let out = artifact.predict(&FeatureVector([1.0; FEATURE_COUNT]));
        assert!((out - 4.6).abs() < 1e-12);
    }
}
