//! Градиентный бустинг для бинарной классификации (биномиальное отклонение)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::decision_tree::RegressionTree;
use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub max_features: f64,
    pub subsample: f64,
    pub seed: u64,
}

impl From<&ModelConfig> for GradientBoostingConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            max_features: config.max_features,
            subsample: config.subsample,
            seed: config.seed,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn log_loss(y: &Array1<f64>, raw: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    let total: f64 = y
        .iter()
        .zip(raw.iter())
        .map(|(&t, &r)| {
            let p = sigmoid(r).clamp(eps, 1.0 - eps);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    total / y.len() as f64
}

/// Классификатор: сумма регрессионных деревьев в пространстве log-odds.
///
/// Каждое дерево обучается на остатках y - p по случайной подвыборке
/// строк, значения листьев заменяются шагом Ньютона sum(r) / sum(p(1-p)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    init_score: Option<f64>,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            init_score: None,
            trees: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.init_score.is_some()
    }

    pub fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = X.nrows();
        let n_features = X.ncols();

        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::EmptyData("Empty dataset".to_string()));
        }
        if y.len() != n_samples {
            return Err(PipelineError::LengthMismatch {
                column: "target".to_string(),
                expected: n_samples,
                got: y.len(),
            });
        }
        if let Some(bad) = y.iter().find(|&&t| t != 0.0 && t != 1.0) {
            return Err(PipelineError::InvalidTarget(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }

        let positive_rate = y.sum() / n_samples as f64;
        if positive_rate == 0.0 || positive_rate == 1.0 {
            return Err(PipelineError::InvalidTarget(
                "target contains a single class".to_string(),
            ));
        }

        let cfg = &self.config;
        let init_score = (positive_rate / (1.0 - positive_rate)).ln();
        let n_sub = ((cfg.subsample * n_samples as f64).floor() as usize).max(1);
        let k_features = ((cfg.max_features * n_features as f64).floor() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let mut raw = Array1::from_elem(n_samples, init_score);
        let mut trees = Vec::with_capacity(cfg.n_estimators);

        for round in 0..cfg.n_estimators {
            let prob = raw.mapv(sigmoid);
            let residual = y - &prob;

            let mut rows = if n_sub < n_samples {
                sample(&mut rng, n_samples, n_sub).into_vec()
            } else {
                (0..n_samples).collect()
            };
            rows.sort_unstable();

            let mut tree = RegressionTree::new(cfg.max_depth, k_features);
            tree.fit_with_leaf(X, &residual, rows, &mut rng, |leaf_rows| {
                let numerator: f64 = leaf_rows.iter().map(|&i| residual[i]).sum();
                let denominator: f64 = leaf_rows.iter().map(|&i| prob[i] * (1.0 - prob[i])).sum();
                if denominator.abs() < 1e-150 {
                    0.0
                } else {
                    numerator / denominator
                }
            })?;

            raw = raw + tree.predict(X)? * cfg.learning_rate;
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                debug!(round = round + 1, loss = log_loss(y, &raw), "Boosting progress");
            }
        }

        info!(
            n_estimators = trees.len(),
            train_loss = log_loss(y, &raw),
            "Gradient boosting fitted"
        );

        self.init_score = Some(init_score);
        self.trees = trees;
        Ok(())
    }

    /// Сырые оценки log-odds
    pub fn decision_function(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let init_score = self
            .init_score
            .ok_or(PipelineError::NotFitted("GradientBoostingClassifier"))?;

        let mut raw = Array1::from_elem(X.nrows(), init_score);
        for tree in &self.trees {
            raw = raw + tree.predict(X)? * self.config.learning_rate;
        }
        Ok(raw)
    }

    /// Вероятность класса 1
    pub fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(X)?.mapv(sigmoid))
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<usize>> {
        Ok(self
            .predict_proba(X)?
            .mapv(|p| if p > 0.5 { 1 } else { 0 }))
    }
}
