//! Tree ensemble classifiers exported as JSON
//!
//! Random forests average the class distribution stored in each tree's leaf.
//! Gradient boosted ensembles add up leaf margins on top of a base score and
//! map the sum through the logistic function (binary only).

use crate::artifacts::read_json;
use crate::error::{PipelineError, Result};
use crate::models::classifier::Classifier;
use serde::Deserialize;
use std::path::Path;

/// How tree outputs are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleKind {
    RandomForest,
    GradientBoosting,
}

/// One node of a decision tree
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
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

fn default_classes() -> usize {
    2
}

/// Tree ensemble loaded from a JSON export
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub kind: EnsembleKind,
    pub n_features: usize,
    #[serde(default = "default_classes")]
    pub n_classes: usize,
    /// Initial margin, gradient boosting only
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Load and validate an ensemble
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ensemble: TreeEnsemble = read_json(path)?;
        ensemble
            .validate()
            .map_err(|reason| PipelineError::artifact(path, reason))?;
        Ok(ensemble)
    }

    /// Check structure so that evaluation can index without bounds failures.
    ///
    /// Children must come after their parent, which rules out cycles.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        if self.n_classes < 2 {
            return Err(format!("n_classes must be at least 2, got {}", self.n_classes));
        }
        if self.kind == EnsembleKind::GradientBoosting && self.n_classes != 2 {
            return Err("gradient boosting ensembles must be binary".to_string());
        }

        let leaf_width = match self.kind {
            EnsembleKind::RandomForest => self.n_classes,
            EnsembleKind::GradientBoosting => 1,
        };

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {} is empty", t));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!(
                                "tree {} node {} splits on feature {} of {}",
                                t, i, feature, self.n_features
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {} node {} has a non-finite threshold", t, i));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(format!(
                                    "tree {} node {} has invalid child {}",
                                    t, i, child
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != leaf_width {
                            return Err(format!(
                                "tree {} leaf {} has {} values, expected {}",
                                t,
                                i,
                                value.len(),
                                leaf_width
                            ));
                        }
                        if value.iter().any(|v| !v.is_finite()) {
                            return Err(format!("tree {} leaf {} has a non-finite value", t, i));
                        }
                        if self.kind == EnsembleKind::RandomForest
                            && (value.iter().any(|v| *v < 0.0) || value.iter().sum::<f64>() <= 0.0)
                        {
                            return Err(format!(
                                "tree {} leaf {} holds no class weight: {:?}",
                                t, i, value
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn leaf<'a>(&self, tree: &'a Tree, features: &[f32]) -> &'a [f64] {
        let mut index = 0;
        loop {
            match &tree.nodes[index] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features[*feature] as f64;
                    let go_left = match self.kind {
                        EnsembleKind::RandomForest => x <= *threshold,
                        EnsembleKind::GradientBoosting => x < *threshold,
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }

    fn forest_proba(&self, features: &[f32]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = self.leaf(tree, features);
            // Leaves may hold raw class counts; validation keeps the sum positive
            let sum: f64 = leaf.iter().sum();
            for (total, v) in totals.iter_mut().zip(leaf) {
                *total += v / sum;
            }
        }
        let n = self.trees.len() as f64;
        totals.into_iter().map(|t| t / n).collect()
    }

    fn boosted_proba(&self, features: &[f32]) -> Vec<f64> {
        let margin: f64 = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.leaf(tree, features)[0])
                .sum::<f64>();
        let fraud = 1.0 / (1.0 + (-margin).exp());
        vec![1.0 - fraud, fraud]
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &'static str {
        match self.kind {
            EnsembleKind::RandomForest => "random_forest",
            EnsembleKind::GradientBoosting => "gradient_boosting",
        }
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(PipelineError::shape(
                "tree ensemble input",
                format!("{} features", self.n_features),
                format!("{} features", features.len()),
            ));
        }

        Ok(match self.kind {
            EnsembleKind::RandomForest => self.forest_proba(features),
            EnsembleKind::GradientBoosting => self.boosted_proba(features),
        })
    }
}
