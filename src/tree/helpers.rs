//! CART building blocks: impurity, split search, recursive growth.

use super::{Leaf, Node, TreeNode};
use crate::primitives::Matrix;
use std::collections::BTreeMap;

/// Gini impurity of a label set: `1 - Σ p_i²`.
pub(super) fn gini_impurity(labels: &[usize]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }

    let counts = class_counts(labels);
    let n = labels.len() as f32;
    let mut gini = 1.0;
    for count in counts.values() {
        let p = *count as f32 / n;
        gini -= p * p;
    }
    gini
}

/// Sample-weighted Gini impurity of a split.
pub(super) fn gini_split(left_labels: &[usize], right_labels: &[usize]) -> f32 {
    let n_left = left_labels.len() as f32;
    let n_right = right_labels.len() as f32;
    let n_total = n_left + n_right;

    if n_total == 0.0 {
        return 0.0;
    }

    (n_left / n_total) * gini_impurity(left_labels)
        + (n_right / n_total) * gini_impurity(right_labels)
}

// BTreeMap keeps iteration order stable across runs.
fn class_counts(labels: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }
    counts
}

fn sorted_unique_values(x: &[f32]) -> Vec<f32> {
    let mut sorted = x.to_vec();
    sorted.sort_by(f32::total_cmp);
    sorted.dedup_by(|a, b| (*a - *b).abs() <= 1e-10);
    sorted
}

fn split_labels_by_threshold(
    x: &[f32],
    y: &[usize],
    threshold: f32,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut left_labels = Vec::new();
    let mut right_labels = Vec::new();

    for (&val, &label) in x.iter().zip(y) {
        if val <= threshold {
            left_labels.push(label);
        } else {
            right_labels.push(label);
        }
    }

    if left_labels.is_empty() || right_labels.is_empty() {
        None
    } else {
        Some((left_labels, right_labels))
    }
}

/// Best midpoint threshold for one feature column, as `(threshold, gain)`.
pub(super) fn find_best_split_for_feature(x: &[f32], y: &[usize]) -> Option<(f32, f32)> {
    if x.len() < 2 {
        return None;
    }

    let unique_values = sorted_unique_values(x);
    if unique_values.len() < 2 {
        return None;
    }

    let current_impurity = gini_impurity(y);
    let mut best_gain = 0.0;
    let mut best_threshold = 0.0;

    for pair in unique_values.windows(2) {
        let threshold = (pair[0] + pair[1]) / 2.0;
        if let Some((left, right)) = split_labels_by_threshold(x, y, threshold) {
            let gain = current_impurity - gini_split(&left, &right);
            if gain > best_gain {
                best_gain = gain;
                best_threshold = threshold;
            }
        }
    }

    (best_gain > 0.0).then_some((best_threshold, best_gain))
}

/// Best split across all features, as `(feature_idx, threshold, gain)`.
pub(super) fn find_best_split(x: &Matrix, y: &[usize]) -> Option<(usize, f32, f32)> {
    if x.n_rows() < 2 {
        return None;
    }

    let mut best: Option<(usize, f32, f32)> = None;
    for feature_idx in 0..x.n_cols() {
        let column = x.column(feature_idx);
        if let Some((threshold, gain)) = find_best_split_for_feature(&column, y) {
            if best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature_idx, threshold, gain));
            }
        }
    }
    best
}

/// Most frequent label; ties go to the lowest class index.
pub(super) fn majority_class(labels: &[usize]) -> usize {
    let mut winner = 0;
    let mut max_count = 0;
    for (label, count) in class_counts(labels) {
        if count > max_count {
            max_count = count;
            winner = label;
        }
    }
    winner
}

/// Returns a leaf if the node is pure or the depth limit is hit.
pub(super) fn check_stopping_criteria(
    y: &[usize],
    depth: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
) -> Option<TreeNode> {
    let n_samples = y.len();

    if y.windows(2).all(|w| w[0] == w[1]) {
        return Some(TreeNode::Leaf(Leaf {
            class_label: y.first().copied().unwrap_or(0),
            n_samples,
        }));
    }

    let depth_reached = max_depth.is_some_and(|max_d| depth >= max_d);
    if depth_reached || n_samples < min_samples_split {
        return Some(TreeNode::Leaf(Leaf {
            class_label: majority_class(y),
            n_samples,
        }));
    }

    None
}

fn split_indices_by_threshold(
    x: &Matrix,
    feature_idx: usize,
    threshold: f32,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let (left, right): (Vec<usize>, Vec<usize>) =
        (0..x.n_rows()).partition(|&row| x.get(row, feature_idx) <= threshold);

    if left.is_empty() || right.is_empty() {
        None
    } else {
        Some((left, right))
    }
}

/// Grows a classification tree recursively.
pub(super) fn build_tree(
    x: &Matrix,
    y: &[usize],
    depth: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
) -> TreeNode {
    if let Some(leaf) = check_stopping_criteria(y, depth, max_depth, min_samples_split) {
        return leaf;
    }

    let majority_leaf = || {
        TreeNode::Leaf(Leaf {
            class_label: majority_class(y),
            n_samples: y.len(),
        })
    };

    let Some((feature_idx, threshold, _gain)) = find_best_split(x, y) else {
        return majority_leaf();
    };
    let Some((left_indices, right_indices)) = split_indices_by_threshold(x, feature_idx, threshold)
    else {
        return majority_leaf();
    };

    let left_labels: Vec<usize> = left_indices.iter().map(|&i| y[i]).collect();
    let right_labels: Vec<usize> = right_indices.iter().map(|&i| y[i]).collect();

    let left = build_tree(
        &x.select_rows(&left_indices),
        &left_labels,
        depth + 1,
        max_depth,
        min_samples_split,
    );
    let right = build_tree(
        &x.select_rows(&right_indices),
        &right_labels,
        depth + 1,
        max_depth,
        min_samples_split,
    );

    TreeNode::Node(Node {
        feature_idx,
        threshold,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// Draws `n_samples` indices with replacement.
pub(super) fn bootstrap_sample(n_samples: usize, random_state: Option<u64>) -> Vec<usize> {
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;

    let dist = Uniform::from(0..n_samples);

    if let Some(seed) = random_state {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
    } else {
        let mut rng = rand::thread_rng();
        (0..n_samples).map(|_| dist.sample(&mut rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ====================================================================
    // Gini
    // ====================================================================

    #[test]
    fn test_gini_pure() {
        assert_eq!(gini_impurity(&[2, 2, 2]), 0.0);
    }

    #[test]
    fn test_gini_balanced_binary() {
        assert!((gini_impurity(&[0, 1, 0, 1]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_gini_empty() {
        assert_eq!(gini_impurity(&[]), 0.0);
        assert_eq!(gini_split(&[], &[]), 0.0);
    }

    #[test]
    fn test_gini_split_perfect() {
        assert_eq!(gini_split(&[0, 0], &[1, 1]), 0.0);
    }

    // ====================================================================
    // Split search
    // ====================================================================

    #[test]
    fn test_best_split_for_feature_midpoint() {
        let (threshold, gain) =
            find_best_split_for_feature(&[1.0, 2.0, 8.0, 9.0], &[0, 0, 1, 1]).unwrap();
        assert!((threshold - 5.0).abs() < 1e-6);
        assert!((gain - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_best_split_constant_feature() {
        assert!(find_best_split_for_feature(&[3.0, 3.0, 3.0], &[0, 1, 0]).is_none());
    }

    #[test]
    fn test_find_best_split_picks_informative_column() {
        // column 0 is noise, column 1 separates classes
        let x = Matrix::from_vec(4, 2, vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0]).unwrap();
        let (feature, _, _) = find_best_split(&x, &[0, 0, 1, 1]).unwrap();
        assert_eq!(feature, 1);
    }

    // ====================================================================
    // Majority / stopping
    // ====================================================================

    #[test]
    fn test_majority_tie_goes_to_lowest() {
        assert_eq!(majority_class(&[3, 1, 3, 1]), 1);
        assert_eq!(majority_class(&[4, 4, 2]), 4);
    }

    #[test]
    fn test_stopping_pure_node() {
        let leaf = check_stopping_criteria(&[5, 5], 0, None, 2).unwrap();
        assert!(matches!(leaf, TreeNode::Leaf(Leaf { class_label: 5, n_samples: 2 })));
    }

    #[test]
    fn test_stopping_max_depth() {
        let leaf = check_stopping_criteria(&[0, 1, 1], 3, Some(3), 2).unwrap();
        assert!(matches!(leaf, TreeNode::Leaf(Leaf { class_label: 1, .. })));
        assert!(check_stopping_criteria(&[0, 1, 1], 2, Some(3), 2).is_none());
    }

    #[test]
    fn test_build_tree_separates_classes() {
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 8.0, 9.0]).unwrap();
        let tree = build_tree(&x, &[0, 0, 1, 1], 0, None, 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_bootstrap_deterministic_with_seed() {
        let a = bootstrap_sample(20, Some(42));
        let b = bootstrap_sample(20, Some(42));
        assert_eq!(a, b);
        assert!(a.iter().all(|&i| i < 20));
    }
}
