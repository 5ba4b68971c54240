//! Регрессионное дерево для градиентного бустинга

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// Дерево по квадратичной ошибке с полным перебором порогов
/// (середины между соседними различными значениями).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    max_depth: usize,
    min_samples_split: usize,
    /// Сколько признаков случайно выбирается для каждого разбиения
    max_features: usize,
    root: Option<TreeNode>,
}

impl RegressionTree {
    pub fn new(max_depth: usize, max_features: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: 2,
            max_features: max_features.max(1),
            root: None,
        }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Строит дерево по строкам `indices`. Значение листа считает `leaf`
    /// по индексам попавших в него строк.
    pub fn fit_with_leaf<R, F>(
        &mut self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        rng: &mut R,
        leaf: F,
    ) -> Result<()>
    where
        R: Rng + ?Sized,
        F: Fn(&[usize]) -> f64,
    {
        if indices.is_empty() || X.ncols() == 0 {
            return Err(PipelineError::EmptyData("no rows to grow a tree on".to_string()));
        }
        if X.nrows() != y.len() {
            return Err(PipelineError::LengthMismatch {
                column: "target".to_string(),
                expected: X.nrows(),
                got: y.len(),
            });
        }

        self.root = Some(self.build_tree(X, y, 0, indices, rng, &leaf));
        Ok(())
    }

    /// Лист со средним значением цели
    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, rng: &mut impl Rng) -> Result<()> {
        let indices = (0..X.nrows()).collect();
        self.fit_with_leaf(X, y, indices, rng, |rows| {
            rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64
        })
    }

    fn build_tree<R, F>(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        depth: usize,
        indices: Vec<usize>,
        rng: &mut R,
        leaf: &F,
    ) -> TreeNode
    where
        R: Rng + ?Sized,
        F: Fn(&[usize]) -> f64,
    {
        if depth >= self.max_depth || indices.len() < self.min_samples_split {
            return TreeNode::Leaf {
                value: leaf(indices.as_slice()),
            };
        }

        let best = match self.find_split(X, y, &indices, rng) {
            Some(best) => best,
            None => {
                return TreeNode::Leaf {
                    value: leaf(indices.as_slice()),
                }
            }
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| X[[i, best.feature]] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build_tree(X, y, depth + 1, left_indices, rng, leaf)),
            right: Box::new(self.build_tree(X, y, depth + 1, right_indices, rng, leaf)),
        }
    }

    /// Максимизирует sum_L^2 / n_L + sum_R^2 / n_R, что равносильно
    /// минимизации суммы квадратов отклонений в потомках
    fn find_split<R: Rng + ?Sized>(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut R,
    ) -> Option<BestSplit> {
        let n_features = X.ncols();
        let k = self.max_features.min(n_features);
        let mut features = sample(rng, n_features, k).into_vec();
        features.sort_unstable();

        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let n = indices.len() as f64;
        let parent_score = total * total / n;

        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| X[[a, feature]].total_cmp(&X[[b, feature]]));

            let mut left_sum = 0.0;
            for pos in 0..order.len() - 1 {
                left_sum += y[order[pos]];
                let current = X[[order[pos], feature]];
                let next = X[[order[pos + 1], feature]];
                if current == next {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left + right_sum * right_sum / (n - n_left);

                if best.as_ref().map_or(true, |b| score > b.score) {
                    let mut threshold = (current + next) / 2.0;
                    if threshold == next {
                        threshold = current;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        // разбиение, не уменьшающее ошибку, не нужно
        best.filter(|b| b.score - parent_score > 1e-12 * parent_score.abs().max(1.0))
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or(PipelineError::NotFitted("RegressionTree"))?;
        Ok(X.rows().into_iter().map(|row| root.predict(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tree_finds_midpoint_split() {
        let X = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut rng = StdRng::seed_from_u64(0);

        let mut tree = RegressionTree::new(1, 1);
        tree.fit(&X, &y, &mut rng).unwrap();

        match tree.root().unwrap() {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 6.5);
            }
            other => panic!("expected split, got {:?}", other),
        }
        assert_eq!(tree.predict(&X).unwrap(), y);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let X = array![[1.0, 5.0], [2.0, 3.0], [3.0, 8.0], [4.0, 1.0], [5.0, 9.0], [6.0, 2.0]];
        let y = array![1.0, 4.0, 2.0, 8.0, 3.0, 7.0];
        let mut rng = StdRng::seed_from_u64(1);

        let mut tree = RegressionTree::new(2, 2);
        tree.fit(&X, &y, &mut rng).unwrap();
        assert!(tree.root().unwrap().depth() <= 2);
    }

    #[test]
    fn test_constant_target_gives_single_leaf() {
        let X = array![[1.0], [2.0], [3.0]];
        let y = array![0.5, 0.5, 0.5];
        let mut rng = StdRng::seed_from_u64(2);

        let mut tree = RegressionTree::new(3, 1);
        tree.fit(&X, &y, &mut rng).unwrap();
        assert_eq!(tree.root(), Some(&TreeNode::Leaf { value: 0.5 }));
    }

    #[test]
    fn test_custom_leaf_value() {
        let X = array![[0.0], [1.0]];
        let y = array![-1.0, 1.0];
        let mut rng = StdRng::seed_from_u64(3);

        let mut tree = RegressionTree::new(1, 1);
        tree.fit_with_leaf(&X, &y, vec![0, 1], &mut rng, |rows| rows.len() as f64 * 10.0)
            .unwrap();
        assert_eq!(tree.predict(&X).unwrap(), array![10.0, 10.0]);
    }

    #[test]
    fn test_unfitted_tree_fails() {
        let tree = RegressionTree::new(3, 1);
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(PipelineError::NotFitted(_))
        ));
    }
}
