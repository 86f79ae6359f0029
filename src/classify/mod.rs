use nalgebra::DMatrix;

use crate::error::Error;
use crate::label::Label;

/// Linear discriminant classifier (per-class means, pooled covariance).
pub mod lda;

/// Random forest classifier (bootstrap + Gini splits + majority vote).
pub mod forest;

pub use lda::LinearDiscriminant;
pub use forest::{RandomForest, ForestConfig};

/// Contract shared by the two model families. A classifier is built
/// untrained (carrying only its configuration), trained exactly once on the
/// training feature matrix, and then queried for predictions on batches with
/// the same column identity and ordering.
pub trait Classifier {

    /// Fits the model. Training consumes nothing: the caller keeps ownership
    /// of features and labels, as every pipeline stage does.
    fn train(&mut self, features : &DMatrix<f64>, labels : &[Label]) -> Result<(), Error>;

    /// Predicts one label per row. Fails if the model is untrained or the
    /// matrix width disagrees with the training matrix.
    fn predict(&self, features : &DMatrix<f64>) -> Result<Vec<Label>, Error>;

    /// Human-readable model name for reports.
    fn name(&self) -> &'static str;

}
