pub mod distance;
pub mod k_nearest;

// Re-export public types and functions
pub use distance::{Distance, DistanceMetric, Manhattan, Scalar, SquaredEuclidean};
pub use k_nearest::{
    evaluate, evaluate_all, knn, knn_with, labels, majority_vote, KNNClassifier, KnnConfig,
    Predictions, DEFAULT_K_VALUES,
};
