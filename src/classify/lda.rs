use nalgebra::{DMatrix, DVector};
use nalgebra::linalg::Cholesky;
use serde::{Serialize, Deserialize};

use crate::error::Error;
use crate::label::Label;
use super::Classifier;

/// Ridge added to the pooled covariance diagonal if it is not positive
/// definite as estimated. Dummy-derived components make near-singularity
/// plausible, so one guarded retry is allowed before failing.
const RIDGE : f64 = 1e-9;

/// Fitted discriminant state: one linear decision function per class present
/// in the training batch, derived from per-class means, a pooled covariance
/// and the class priors via Bayes' rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Discriminant {

    classes : Vec<Label>,

    /// Σ^-1 μ_k per class, the linear weight of the decision function.
    weights : Vec<DVector<f64>>,

    /// -½ μ_k' Σ^-1 μ_k + ln π_k per class.
    offsets : Vec<f64>,

    n_features : usize

}

/// Linear discriminant analysis over the coarse label space. Assumes each
/// class is approximately multivariate normal with a shared covariance; the
/// assumption degrades on binary dummy-derived inputs, which is an expected
/// weakness of the model family rather than a defect of the fit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearDiscriminant {
    fitted : Option<Discriminant>
}

impl LinearDiscriminant {

    pub fn new() -> Self {
        Self { fitted : None }
    }

}

impl Classifier for LinearDiscriminant {

    fn train(&mut self, features : &DMatrix<f64>, labels : &[Label]) -> Result<(), Error> {
        let n = features.nrows();
        let p = features.ncols();
        if labels.len() != n {
            return Err(Error::SchemaMismatch {
                ctx : "discriminant training",
                expected : n,
                found : labels.len()
            });
        }
        if n == 0 {
            return Err(Error::Numeric("empty training batch".to_string()));
        }

        // Group row indices by class, keeping the fixed label order.
        let mut groups : Vec<(Label, Vec<usize>)> = Vec::new();
        for class in Label::ALL.iter().copied() {
            let rows : Vec<usize> = labels.iter().enumerate()
                .filter(|(_, l)| **l == class )
                .map(|(i, _)| i )
                .collect();
            if !rows.is_empty() {
                groups.push((class, rows));
            }
        }

        let mut classes = Vec::with_capacity(groups.len());
        let mut means = Vec::with_capacity(groups.len());
        let mut priors = Vec::with_capacity(groups.len());
        let mut scatter = DMatrix::zeros(p, p);
        for (class, rows) in &groups {
            let mut mean = DVector::zeros(p);
            for i in rows {
                mean += features.row(*i).transpose();
            }
            mean /= rows.len() as f64;
            for i in rows {
                let dev = features.row(*i).transpose() - &mean;
                scatter += &dev * dev.transpose();
            }
            classes.push(*class);
            means.push(mean);
            priors.push(rows.len() as f64 / n as f64);
        }

        let dof = (n as i64 - groups.len() as i64).max(1) as f64;
        let sigma = scatter / dof;
        let chol = match Cholesky::new(sigma.clone()) {
            Some(c) => c,
            None => {
                let ridged = sigma + DMatrix::identity(p, p) * RIDGE;
                Cholesky::new(ridged).ok_or_else(|| {
                    Error::Numeric("pooled covariance is singular".to_string())
                })?
            }
        };

        let mut weights = Vec::with_capacity(classes.len());
        let mut offsets = Vec::with_capacity(classes.len());
        for (mean, prior) in means.iter().zip(priors.iter()) {
            let w = chol.solve(mean);
            let b = -0.5 * mean.dot(&w) + prior.ln();
            weights.push(w);
            offsets.push(b);
        }

        self.fitted = Some(Discriminant { classes, weights, offsets, n_features : p });
        Ok(())
    }

    fn predict(&self, features : &DMatrix<f64>) -> Result<Vec<Label>, Error> {
        let fitted = self.fitted.as_ref().ok_or(Error::Untrained("lda"))?;
        if features.ncols() != fitted.n_features {
            return Err(Error::FeatureMismatch {
                expected : fitted.n_features,
                found : features.ncols()
            });
        }
        let mut out = Vec::with_capacity(features.nrows());
        for i in 0..features.nrows() {
            let x = features.row(i).transpose();
            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (k, (w, b)) in fitted.weights.iter().zip(fitted.offsets.iter()).enumerate() {
                let score = x.dot(w) + b;
                if score > best_score {
                    best_score = score;
                    best = k;
                }
            }
            out.push(fitted.classes[best]);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "lda"
    }

}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn separable_classes_are_recovered() {
        let features = DMatrix::from_row_slice(6, 2, &[
            0.0, 0.1,
            0.2, 0.0,
            0.1, 0.2,
            5.0, 5.1,
            5.2, 4.9,
            4.9, 5.0
        ]);
        let labels = vec![
            Label::Normal, Label::Normal, Label::Normal,
            Label::Dos, Label::Dos, Label::Dos
        ];
        let mut lda = LinearDiscriminant::new();
        lda.train(&features, &labels).unwrap();
        let test = DMatrix::from_row_slice(2, 2, &[0.05, 0.05, 5.05, 5.05]);
        assert_eq!(lda.predict(&test).unwrap(), vec![Label::Normal, Label::Dos]);
    }

    #[test]
    fn untrained_predict_fails() {
        let lda = LinearDiscriminant::new();
        let m = DMatrix::zeros(1, 2);
        assert!(matches!(lda.predict(&m), Err(Error::Untrained("lda"))));
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let features = DMatrix::from_row_slice(4, 2, &[0., 0., 0.1, 0., 5., 5., 5.1, 5.]);
        let labels = vec![Label::Normal, Label::Normal, Label::Dos, Label::Dos];
        let mut lda = LinearDiscriminant::new();
        lda.train(&features, &labels).unwrap();
        let bad = DMatrix::zeros(1, 3);
        assert!(matches!(lda.predict(&bad), Err(Error::FeatureMismatch { expected : 2, found : 3 })));
    }

}
