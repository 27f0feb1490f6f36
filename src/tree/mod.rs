//! Decision tree and random forest classifiers.
//!
//! - CART trees split on Gini impurity, thresholds at value midpoints
//! - The forest trains each tree on a bootstrap sample and predicts by
//!   majority vote (ties go to the lowest class index)
//!
//! Fitted forests persist as JSON so they can be shipped next to the
//! training column list.
//!
//! # Example
//!
//! ```
//! use dpe_predict::prelude::*;
//!
//! let x = Matrix::from_vec(6, 2, vec![
//!     0.0, 1.0,
//!     0.5, 1.5,
//!     1.0, 1.0,
//!     8.0, 0.0,
//!     9.0, 0.5,
//!     9.5, 0.0,
//! ]).expect("6x2 matrix");
//! let y = vec![0, 0, 0, 1, 1, 1];
//!
//! let mut forest = RandomForestClassifier::new(10)
//!     .with_max_depth(4)
//!     .with_random_state(42);
//! forest.fit(&x, &y).expect("fit succeeds");
//!
//! assert_eq!(forest.predict_row(&[8.5, 0.2]).expect("fitted"), 1);
//! let proba = forest.predict_proba(&[8.5, 0.2]).expect("fitted");
//! assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-5);
//! ```

mod helpers;

use crate::error::{DpeError, Result};
use crate::primitives::Matrix;
use crate::traits::Classifier;
use helpers::{bootstrap_sample, build_tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Internal node in a decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f32,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<TreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<TreeNode>,
}

/// Leaf node in a decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    /// Predicted class label for this leaf
    pub class_label: usize,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// A node in a decision tree (either internal node or leaf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node with split condition
    Node(Node),
    /// Leaf node with class prediction
    Leaf(Leaf),
}

impl TreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    /// Largest feature index referenced by any split.
    fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf(_) => None,
            TreeNode::Node(node) => Some(node.feature_idx)
                .max(node.left.max_feature_idx())
                .max(node.right.max_feature_idx()),
        }
    }
}

/// Decision tree classifier using the CART algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    min_samples_split: usize,
    /// Number of features the model was trained on (for validation)
    #[serde(default)]
    n_features: Option<usize>,
}

fn default_min_samples_split() -> usize {
    2
}

impl DecisionTreeClassifier {
    /// Creates a new decision tree classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            n_features: None,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Nodes with fewer samples than this become leaves.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Depth of the fitted tree, `None` before fit.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::depth)
    }

    fn validate(&self) -> Result<()> {
        let (Some(tree), Some(n_features)) = (&self.tree, self.n_features) else {
            return Err(DpeError::format("decision tree is not fitted"));
        };
        if tree.max_feature_idx().is_some_and(|idx| idx >= n_features) {
            return Err(DpeError::format(format!(
                "decision tree splits on a feature beyond its {n_features} inputs"
            )));
        }
        Ok(())
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Matrix, y: &[usize]) -> Result<()> {
        let (n_rows, n_cols) = x.shape();
        if n_rows != y.len() {
            return Err(DpeError::dimension_mismatch("samples", n_rows, y.len()));
        }
        if n_rows == 0 {
            return Err(DpeError::empty_input("cannot fit with zero samples"));
        }

        self.n_features = Some(n_cols);
        self.tree = Some(build_tree(x, y, 0, self.max_depth, self.min_samples_split));
        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> Result<usize> {
        let (Some(tree), Some(expected)) = (&self.tree, self.n_features) else {
            return Err(DpeError::Prediction("decision tree is not fitted".into()));
        };
        if row.len() != expected {
            return Err(DpeError::dimension_mismatch("features", expected, row.len()));
        }

        let mut node = tree;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return Ok(leaf.class_label),
                TreeNode::Node(internal) => {
                    node = if row[internal.feature_idx] <= internal.threshold {
                        &internal.left
                    } else {
                        &internal.right
                    };
                }
            }
        }
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

/// Random Forest classifier: bagged CART trees with majority voting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    max_depth: Option<usize>,
    random_state: Option<u64>,
    #[serde(default)]
    n_features: Option<usize>,
    #[serde(default)]
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Creates a new Random Forest classifier with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            random_state: None,
            n_features: None,
            n_classes: 0,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the random state for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of classes seen during fit (max label + 1).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Vote shares per class for a single row; entries sum to 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the forest is not fitted or the row width is wrong.
    pub fn predict_proba(&self, row: &[f32]) -> Result<Vec<f32>> {
        let votes = self.votes(row)?;
        let n_trees = self.trees.len() as f32;
        let mut proba = vec![0.0f32; self.n_classes.max(1)];
        for (class, count) in votes {
            if let Some(slot) = proba.get_mut(class) {
                *slot = count as f32 / n_trees;
            }
        }
        Ok(proba)
    }

    fn votes(&self, row: &[f32]) -> Result<BTreeMap<usize, usize>> {
        if self.trees.is_empty() {
            return Err(DpeError::Prediction("random forest is not fitted".into()));
        }
        let mut votes = BTreeMap::new();
        for tree in &self.trees {
            *votes.entry(tree.predict_row(row)?).or_insert(0usize) += 1;
        }
        Ok(votes)
    }

    /// Saves the forest as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a forest saved with [`save`](Self::save) and checks it is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or parsed, or holds an
    /// unfitted or inconsistent forest.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let forest: Self = serde_json::from_str(&json)?;

        let Some(n_features) = forest.n_features else {
            return Err(DpeError::format("random forest is not fitted"));
        };
        if forest.trees.is_empty() {
            return Err(DpeError::format("random forest has no trees"));
        }
        for tree in &forest.trees {
            tree.validate()?;
            if tree.n_features != Some(n_features) {
                return Err(DpeError::format(
                    "random forest trees disagree on the feature count",
                ));
            }
        }
        Ok(forest)
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &Matrix, y: &[usize]) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(DpeError::dimension_mismatch("samples", n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(DpeError::empty_input("cannot fit with zero samples"));
        }
        if self.n_estimators == 0 {
            return Err(DpeError::invalid_input(
                "n_estimators",
                "must be at least 1",
            ));
        }

        self.trees = Vec::with_capacity(self.n_estimators);
        for i in 0..self.n_estimators {
            let seed = self.random_state.map(|s| s.wrapping_add(i as u64));
            let indices = bootstrap_sample(n_samples, seed);

            let bootstrap_x = x.select_rows(&indices);
            let bootstrap_y: Vec<usize> = indices.iter().map(|&idx| y[idx]).collect();

            let mut tree = DecisionTreeClassifier::new();
            tree.max_depth = self.max_depth;
            tree.fit(&bootstrap_x, &bootstrap_y)?;
            // Bootstrap rows keep the full width.
            tree.n_features = Some(n_features);
            self.trees.push(tree);
        }

        self.n_features = Some(n_features);
        self.n_classes = y.iter().max().map_or(0, |max| max + 1);
        tracing::debug!(
            n_trees = self.trees.len(),
            n_features,
            n_classes = self.n_classes,
            "random forest fitted"
        );
        Ok(())
    }

    fn predict_row(&self, row: &[f32]) -> Result<usize> {
        let mut winner = 0;
        let mut max_votes = 0;
        for (class, count) in self.votes(row)? {
            if count > max_votes {
                max_votes = count;
                winner = class;
            }
        }
        Ok(winner)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}
