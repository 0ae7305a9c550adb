//! Pass/Fail classifier loaded from a JSON model artifact.
//!
//! The artifact is produced outside this tool. It names the feature schema
//! it was trained on and the class labels, and carries either a logistic
//! regression or a random forest. Everything is validated at load time so a
//! model that loads can always score a `FeatureRecord`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{FeatureRecord, Label, PredictionResult, FEATURE_NAMES};

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Format(#[from] serde_json::Error),

    #[error("model feature schema {found:?} does not match expected {expected:?}")]
    FeatureSchema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unsupported class label {0:?}; expected Pass or Fail")]
    UnknownClass(String),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("feature vector has {found} values but the model expects {expected}")]
    SchemaMismatch { expected: usize, found: usize },
}

impl ModelError {
    fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Scores a dense feature vector.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// Per-class probabilities, aligned with the artifact's class list.
    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    fn validate(&self, n_features: usize, n_classes: usize) -> ModelResult<()>;
}

#[derive(Debug, Deserialize)]
struct Artifact {
    feature_names: Vec<String>,
    classes: Vec<String>,
    model: ModelSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelSpec {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let z: f64 = match &self.scaler {
            Some(scaler) => x
                .iter()
                .zip(scaler.mean.iter().zip(scaler.scale.iter()))
                .zip(self.coefficients.iter())
                .map(|((value, (mean, scale)), w)| w * (value - mean) / scale)
                .sum(),
            None => x
                .iter()
                .zip(self.coefficients.iter())
                .map(|(value, w)| w * value)
                .sum(),
        };
        let positive = sigmoid(z + self.intercept);
        vec![1.0 - positive, positive]
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> ModelResult<()> {
        if n_classes != 2 {
            return Err(ModelError::invalid(format!(
                "logistic regression needs exactly 2 classes, got {n_classes}"
            )));
        }
        if self.coefficients.len() != n_features {
            return Err(ModelError::invalid(format!(
                "{} coefficients for {n_features} features",
                self.coefficients.len()
            )));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                return Err(ModelError::invalid("scaler width does not match features"));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ModelError::invalid("scaler scale must be finite and non-zero"));
            }
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::invalid("coefficients must be finite"));
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn leaf_distribution(&self, x: &[f64]) -> Vec<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    return value.iter().map(|v| v / total).collect();
                }
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::invalid("tree has no nodes"));
        }
        let len = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::invalid(format!(
                            "node {index} splits on feature {feature} of {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelError::invalid(format!(
                            "node {index} has a non-finite threshold"
                        )));
                    }
                    // Children point forward, so traversal always terminates.
                    for child in [*left, *right] {
                        if child <= index || child >= len {
                            return Err(ModelError::invalid(format!(
                                "node {index} has invalid child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(ModelError::invalid(format!(
                            "leaf {index} has {} values for {n_classes} classes",
                            value.len()
                        )));
                    }
                    if value.iter().any(|v| *v < 0.0 || !v.is_finite()) {
                        return Err(ModelError::invalid(format!(
                            "leaf {index} has a negative or non-finite weight"
                        )));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(ModelError::invalid(format!("leaf {index} is empty")));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut totals: Vec<f64> = Vec::new();
        for tree in self.trees.iter() {
            let distribution = tree.leaf_distribution(x);
            if totals.is_empty() {
                totals = vec![0.0; distribution.len()];
            }
            for (total, p) in totals.iter_mut().zip(distribution) {
                *total += p;
            }
        }
        let count = self.trees.len() as f64;
        totals.into_iter().map(|total| total / count).collect()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> ModelResult<()> {
        if self.n_features != n_features {
            return Err(ModelError::invalid(format!(
                "forest declares {} features, schema has {n_features}",
                self.n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::invalid("forest has no trees"));
        }
        for tree in self.trees.iter() {
            tree.validate(n_features, n_classes)?;
        }
        Ok(())
    }
}

pub struct Predictor {
    classes: Vec<Label>,
    model: Box<dyn Classifier>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("classes", &self.classes)
            .field("n_features", &self.model.n_features())
            .finish()
    }
}

impl Predictor {
    pub fn load(path: &Path) -> ModelResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let predictor = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            classes = ?predictor.classes(),
            "model loaded"
        );
        Ok(predictor)
    }

    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let artifact: Artifact = serde_json::from_str(raw)?;

        if artifact.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(ModelError::FeatureSchema {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: artifact.feature_names,
            });
        }

        let classes = artifact
            .classes
            .iter()
            .map(|name| Label::parse(name).ok_or_else(|| ModelError::UnknownClass(name.clone())))
            .collect::<ModelResult<Vec<Label>>>()?;
        if classes.is_empty() {
            return Err(ModelError::invalid("model declares no classes"));
        }

        let model: Box<dyn Classifier> = match artifact.model {
            ModelSpec::LogisticRegression(model) => Box::new(model),
            ModelSpec::RandomForest(model) => Box::new(model),
        };
        model.validate(FEATURE_NAMES.len(), classes.len())?;

        Ok(Self { classes, model })
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn predict(&self, record: &FeatureRecord) -> ModelResult<PredictionResult> {
        self.predict_features(&record.to_features())
    }

    fn predict_features(&self, x: &[f64]) -> ModelResult<PredictionResult> {
        let expected = self.model.n_features();
        if x.len() != expected {
            return Err(ModelError::SchemaMismatch {
                expected,
                found: x.len(),
            });
        }

        let proba = self.model.predict_proba(x);
        if proba.len() != self.classes.len() {
            return Err(ModelError::invalid(format!(
                "model returned {} probabilities for {} classes",
                proba.len(),
                self.classes.len()
            )));
        }

        // First maximum wins on ties.
        let mut best = 0;
        for (index, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = index;
            }
        }

        Ok(PredictionResult {
            label: self.classes[best],
            probabilities: self.classes.iter().copied().zip(proba).collect(),
        })
    }
}
