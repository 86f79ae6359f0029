/// Crate-wide error taxonomy. Unknown labels, schema drift between a batch
/// and the specs fit on training data, and degenerate (zero-variance) columns
/// are all unrecoverable and abort the run.
pub mod error;

/// Coarse connection labels (DoS, Probe, R2L, U2R, normal) and the mapping
/// from the raw attack-subtype vocabulary.
pub mod label;

/// Schema parsing and CSV ingestion of connection records into typed columns.
pub mod table;

/// Full-rank dummy encoding of nominal columns, with levels fixed at fit time
/// and reused verbatim for every transformed batch.
pub mod encode;

/// Principal-component reduction: centering, unit-variance scaling and an
/// orthogonal rotation fit once on training data, applied unchanged elsewhere.
pub mod reduce;

/// The classifier contract and its two implementations: a linear
/// discriminant and a random forest.
pub mod classify;

/// Confusion matrix and support-weighted F1 over the fixed label space.
pub mod score;

/// Orchestration of the two reduction branches (numeric and dummy) and the
/// train/evaluate cycle, plus the serializable evaluation report.
pub mod pipeline;

pub use error::Error;
