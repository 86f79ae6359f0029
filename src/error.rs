use thiserror::Error;

/// Errors terminating a pipeline run. All of them indicate either data
/// corruption or drift between the dataset and the fitted specs, so there is
/// no partial-success mode: the first error propagates to the caller.
#[derive(Debug, Error)]
pub enum Error {

    /// A raw label failed to resolve to one of the five coarse classes.
    #[error("Unknown raw label '{0}'")]
    UnknownLabel(String),

    /// A batch disagrees with the column identity recorded at fit time.
    #[error("Schema mismatch at {ctx}: expected {expected} columns, found {found}")]
    SchemaMismatch { ctx : &'static str, expected : usize, found : usize },

    /// A numeric column has zero variance, which breaks unit-variance scaling.
    #[error("Degenerate column {0} (zero variance)")]
    DegenerateColumn(usize),

    /// A field failed to parse as the type declared by the schema.
    #[error("Parse failure at row {row}, column '{col}': {msg}")]
    Parse { row : usize, col : String, msg : String },

    /// The schema file declares no attributes or is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// More components were requested than the reduction retains.
    #[error("Requested {requested} components, but the reduction only has {available}")]
    Components { requested : usize, available : usize },

    /// A model was asked to predict before (or with a different shape than) training.
    #[error("Model/feature mismatch: model expects {expected} features, matrix has {found}")]
    FeatureMismatch { expected : usize, found : usize },

    /// A classifier was queried before being trained.
    #[error("Classifier '{0}' used before training")]
    Untrained(&'static str),

    /// A matrix decomposition failed (e.g. a singular pooled covariance).
    #[error("Numerical failure: {0}")]
    Numeric(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

}
