mod estimator_traits;

pub use estimator_traits::{ClusteringTrait, EstimatorTrait, NoAlternatives, UnavailableEstimator};
