use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};

use crate::classify::Classifier;
use crate::encode::EncodingSpec;
use crate::error::Error;
use crate::label::Label;
use crate::reduce::ReductionSpec;
use crate::score::{ClassMetrics, ConfusionMatrix};
use crate::table::Dataset;

/// Pipeline-level configuration. The retained component counts default to
/// the reference configuration (20 numeric + 14 dummy-derived) but are
/// ordinary parameters; the `service` column (66 levels in this dataset) is
/// excluded from encoding by default to keep the dummy block reasonable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {

    pub numeric_components : usize,

    pub dummy_components : usize,

    /// Nominal columns left out of the dummy encoding.
    pub exclude : Vec<String>

}

impl Default for PipelineConfig {

    fn default() -> Self {
        Self {
            numeric_components : 20,
            dummy_components : 14,
            exclude : vec!["service".to_string()]
        }
    }

}

/// Everything fit on the training batch, bundled as one immutable value:
/// the dummy-encoding levels, the two independent reductions (numeric block
/// and dummy block) and the training column identity. Transforming any other
/// batch reuses this state verbatim; nothing here is ever refit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {

    config : PipelineConfig,

    encoding : EncodingSpec,

    numeric_reduction : ReductionSpec,

    dummy_reduction : ReductionSpec,

    /// Numeric column names seen at fit time, used to reject drifted batches.
    numeric_names : Vec<String>

}

fn in_scope(data : &Dataset, exclude : &[String]) -> Vec<(String, Vec<String>)> {
    data.nominal.iter()
        .filter(|(name, _)| !exclude.contains(name) )
        .cloned()
        .collect()
}

/// Encodes the in-scope nominal columns. With nothing in scope the dummy
/// block is a zero-width matrix with the batch's row count, so the rest of
/// the pipeline needs no special case.
fn dummy_block(
    encoding : &EncodingSpec,
    data : &Dataset,
    exclude : &[String]
) -> Result<DMatrix<f64>, Error> {
    let scope = in_scope(data, exclude);
    if scope.is_empty() {
        Ok(DMatrix::zeros(data.nrows(), 0))
    } else {
        encoding.transform(&scope)
    }
}

impl FittedPipeline {

    /// Fits the encoder on the in-scope nominal columns and one reduction per
    /// feature block. Component counts are validated here so a configuration
    /// asking for more components than the data carries fails at fit time,
    /// not at the first transform.
    pub fn fit(train : &Dataset, config : PipelineConfig) -> Result<Self, Error> {
        let encoding = EncodingSpec::fit(&in_scope(train, &config.exclude));
        let dummies = dummy_block(&encoding, train, &config.exclude)?;
        let numeric_reduction = ReductionSpec::fit(&train.numeric)?;
        let dummy_reduction = ReductionSpec::fit(&dummies)?;
        if config.numeric_components > numeric_reduction.n_components() {
            return Err(Error::Components {
                requested : config.numeric_components,
                available : numeric_reduction.n_components()
            });
        }
        if config.dummy_components > dummy_reduction.n_components() {
            return Err(Error::Components {
                requested : config.dummy_components,
                available : dummy_reduction.n_components()
            });
        }
        Ok(Self {
            config,
            encoding,
            numeric_reduction,
            dummy_reduction,
            numeric_names : train.numeric_names.clone()
        })
    }

    /// Reduces both branches of a batch with the stored specs and
    /// concatenates them into the final feature matrix (numeric components
    /// first, dummy-derived components after).
    pub fn features(&self, data : &Dataset) -> Result<DMatrix<f64>, Error> {
        if data.numeric_names != self.numeric_names {
            return Err(Error::SchemaMismatch {
                ctx : "pipeline numeric block",
                expected : self.numeric_names.len(),
                found : data.numeric_names.len()
            });
        }
        let reduced_numeric = self.numeric_reduction
            .transform(&data.numeric, self.config.numeric_components)?;
        let dummies = dummy_block(&self.encoding, data, &self.config.exclude)?;
        let reduced_dummies = self.dummy_reduction
            .transform(&dummies, self.config.dummy_components)?;

        let n = data.nrows();
        let k1 = reduced_numeric.ncols();
        let k2 = reduced_dummies.ncols();
        Ok(DMatrix::from_fn(n, k1 + k2, |i, j| {
            if j < k1 {
                reduced_numeric[(i, j)]
            } else {
                reduced_dummies[(i, j - k1)]
            }
        }))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn numeric_reduction(&self) -> &ReductionSpec {
        &self.numeric_reduction
    }

    pub fn dummy_reduction(&self) -> &ReductionSpec {
        &self.dummy_reduction
    }

    pub fn save<P : AsRef<Path>>(&self, path : P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn open<P : AsRef<Path>>(path : P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

}

/// Summary artifacts of one train/predict cycle for one model: the confusion
/// grid, per-class metrics and the support-weighted F1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {

    pub model : String,

    pub confusion : ConfusionMatrix,

    pub class_metrics : Vec<ClassMetrics>,

    pub weighted_f1 : f64

}

impl Evaluation {

    pub fn new(model : &str, predicted : &[Label], actual : &[Label]) -> Result<Self, Error> {
        let confusion = ConfusionMatrix::new(predicted, actual)?;
        let class_metrics = confusion.class_metrics();
        let weighted_f1 = confusion.weighted_f1();
        Ok(Self { model : model.to_string(), confusion, class_metrics, weighted_f1 })
    }

    pub fn save<P : AsRef<Path>>(&self, path : P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

}

impl Display for Evaluation {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "model: {}", self.model)?;
        writeln!(f, "{}", self.confusion)?;
        writeln!(f, "{:>10}{:>10}{:>11}{:>8}{:>8}", "class", "support", "precision", "recall", "f1")?;
        for m in &self.class_metrics {
            writeln!(
                f,
                "{:>10}{:>10}{:>11.4}{:>8.4}{:>8.4}",
                m.label.name(), m.support, m.precision, m.recall, m.f1
            )?;
        }
        writeln!(f, "weighted F1: {:.2}", self.weighted_f1)
    }

}

/// Runs the full cycle for one classifier: transform both batches with the
/// fitted pipeline, train on the training features, predict the test batch
/// and score against the test labels.
pub fn evaluate(
    classifier : &mut dyn Classifier,
    pipeline : &FittedPipeline,
    train : &Dataset,
    test : &Dataset
) -> Result<Evaluation, Error> {
    let train_features = pipeline.features(train)?;
    classifier.train(&train_features, &train.labels)?;
    let test_features = pipeline.features(test)?;
    let predicted = classifier.predict(&test_features)?;
    Evaluation::new(classifier.name(), &predicted, &test.labels)
}
