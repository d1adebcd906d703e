pub mod dataset;
pub mod error;
pub mod ml;

pub use error::{Error, Result};
pub use ml::classic::{evaluate, evaluate_all, knn, knn_with, KNNClassifier, KnnConfig, Predictions};
