/// ML модели

pub mod decision_tree;
pub mod gradient_boosting;
pub mod survival;

pub use decision_tree::{RegressionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use survival::SurvivalModel;
