use nalgebra::{DMatrix, DVector};
use nalgebra::linalg::SymmetricEigen;
use serde::{Serialize, Deserialize};

use crate::error::Error;

/// Variance below this is treated as zero (the column is degenerate).
const VAR_EPS : f64 = 1e-12;

/// A principal-component reduction fit once on the training batch: per-column
/// center and scale, the orthogonal rotation, and the eigenvalue spectrum.
/// `transform` applies the stored quantities unchanged to any batch with the
/// same columns; there is deliberately no way to refit an existing spec.
///
/// Zero-variance columns found at fit time are recorded and excluded from the
/// rotation, and the same columns are excluded again at transform time, so
/// the generalization of "drop the all-zero columns" is by variance, not by
/// column name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionSpec {

    center : DVector<f64>,

    scale : DVector<f64>,

    /// Columns are the rotation axes, in descending eigenvalue order.
    rotation : DMatrix<f64>,

    eigenvalues : DVector<f64>,

    /// Indices (into the original matrix) of the columns that survived the
    /// degeneracy check, in their original order.
    kept : Vec<usize>,

    /// Original column count, used to reject mismatched batches.
    input_cols : usize,

    /// Zero-variance columns dropped at fit time.
    dropped : Vec<usize>

}

impl ReductionSpec {

    /// Centers each column to mean zero, scales to unit variance and
    /// eigendecomposes the resulting correlation matrix. Components are
    /// ordered by strictly descending eigenvalue; equal eigenvalues keep the
    /// decomposition's own order, so the result is deterministic for a given
    /// input. Degenerate columns are dropped and recorded.
    pub fn fit(matrix : &DMatrix<f64>) -> Result<Self, Error> {
        Self::fit_inner(matrix, false)
    }

    /// Same as [ReductionSpec::fit], but a degenerate column is an error
    /// instead of being dropped.
    pub fn fit_strict(matrix : &DMatrix<f64>) -> Result<Self, Error> {
        Self::fit_inner(matrix, true)
    }

    fn fit_inner(matrix : &DMatrix<f64>, strict : bool) -> Result<Self, Error> {
        let n = matrix.nrows();
        if n < 2 {
            return Err(Error::Numeric(
                format!("cannot fit a reduction on {} row(s)", n)
            ));
        }
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        let mut means = Vec::new();
        let mut sds = Vec::new();
        for j in 0..matrix.ncols() {
            let col = matrix.column(j);
            let mean = col.sum() / n as f64;
            let var = col.iter().map(|x| (x - mean).powi(2) ).sum::<f64>() / (n as f64 - 1.);
            if var <= VAR_EPS {
                if strict {
                    return Err(Error::DegenerateColumn(j));
                }
                dropped.push(j);
            } else {
                kept.push(j);
                means.push(mean);
                sds.push(var.sqrt());
            }
        }
        let p = kept.len();
        let center = DVector::from_vec(means);
        let scale = DVector::from_vec(sds);
        if p == 0 {
            // Every column degenerate (or the matrix had no columns): an
            // empty reduction that only ever yields zero-width output.
            return Ok(Self {
                center,
                scale,
                rotation : DMatrix::zeros(0, 0),
                eigenvalues : DVector::zeros(0),
                kept,
                input_cols : matrix.ncols(),
                dropped
            });
        }

        let std = DMatrix::from_fn(n, p, |i, j| {
            (matrix[(i, kept[j])] - center[j]) / scale[j]
        });
        let corr = std.transpose() * &std / (n as f64 - 1.);
        let eigen = SymmetricEigen::new(corr);

        // Stable descending order over the eigenvalue spectrum.
        let mut order : Vec<usize> = (0..p).collect();
        order.sort_by(|a, b| {
            eigen.eigenvalues[*b].partial_cmp(&eigen.eigenvalues[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let rotation = DMatrix::from_fn(p, p, |i, j| eigen.eigenvectors[(i, order[j])] );
        let eigenvalues = DVector::from_fn(p, |j, _| eigen.eigenvalues[order[j]].max(0.) );

        Ok(Self {
            center,
            scale,
            rotation,
            eigenvalues,
            kept,
            input_cols : matrix.ncols(),
            dropped
        })
    }

    /// Applies the stored center, scale and rotation, then truncates to the
    /// `k` leading components. The batch must carry exactly the columns the
    /// spec was fit on.
    pub fn transform(&self, matrix : &DMatrix<f64>, k : usize) -> Result<DMatrix<f64>, Error> {
        if matrix.ncols() != self.input_cols {
            return Err(Error::SchemaMismatch {
                ctx : "reduction",
                expected : self.input_cols,
                found : matrix.ncols()
            });
        }
        if k > self.rotation.ncols() {
            return Err(Error::Components {
                requested : k,
                available : self.rotation.ncols()
            });
        }
        let n = matrix.nrows();
        let p = self.kept.len();
        let std = DMatrix::from_fn(n, p, |i, j| {
            (matrix[(i, self.kept[j])] - self.center[j]) / self.scale[j]
        });
        Ok(&std * self.rotation.columns(0, k))
    }

    /// Proportion of variance explained by each component,
    /// `eigenvalue_i / sum(eigenvalues)`, in component order.
    pub fn explained_variance(&self) -> DVector<f64> {
        let total = self.eigenvalues.sum();
        if total <= 0. {
            return DVector::zeros(self.eigenvalues.len());
        }
        self.eigenvalues.map(|ev| ev / total )
    }

    /// Cumulative explained variance, useful for choosing how many
    /// components to retain.
    pub fn cumulative_variance(&self) -> DVector<f64> {
        let props = self.explained_variance();
        let mut acc = 0.;
        DVector::from_fn(props.len(), |i, _| {
            acc += props[i];
            acc
        })
    }

    pub fn n_components(&self) -> usize {
        self.rotation.ncols()
    }

    pub fn dropped_columns(&self) -> &[usize] {
        &self.dropped
    }

}
