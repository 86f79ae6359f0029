use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};

use crate::error::Error;

/// The fixed level set of one nominal column, recorded at fit time. Levels
/// are kept sorted so the encoding is deterministic regardless of row order;
/// the first level is the reference and produces no dummy column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLevels {

    pub name : String,

    pub levels : Vec<String>

}

impl ColumnLevels {

    /// Number of dummy columns this column contributes (levels minus the
    /// reference; zero for a single-level column).
    pub fn width(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

}

/// Full-rank dummy encoding fit on the training batch. The spec is an
/// immutable value object: `transform` reuses the recorded levels verbatim on
/// every batch, so a test batch can neither introduce new dummy columns nor
/// lose columns for levels it happens not to contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSpec {
    columns : Vec<ColumnLevels>
}

impl EncodingSpec {

    /// Records the ordered level set of every nominal column in the training
    /// batch. Columns are kept in the order given (schema order); the caller
    /// decides which nominal columns are in scope, so excluding a
    /// high-cardinality column is done by not passing it here.
    pub fn fit(columns : &[(String, Vec<String>)]) -> Self {
        let columns = columns.iter().map(|(name, values)| {
            let mut levels : Vec<String> = values.to_vec();
            levels.sort();
            levels.dedup();
            ColumnLevels { name : name.clone(), levels }
        }).collect();
        Self { columns }
    }

    /// Emits one binary column per non-reference (column, level) pair, in the
    /// exact order recorded by `fit`. A level absent from the batch yields an
    /// all-zero column; a value absent from the recorded levels encodes as
    /// all zeros (indistinguishable from the reference level, never learned).
    pub fn transform(&self, columns : &[(String, Vec<String>)]) -> Result<DMatrix<f64>, Error> {
        if columns.len() != self.columns.len() {
            return Err(Error::SchemaMismatch {
                ctx : "dummy encoding",
                expected : self.columns.len(),
                found : columns.len()
            });
        }
        for (spec, (name, _)) in self.columns.iter().zip(columns.iter()) {
            if spec.name != *name {
                return Err(Error::SchemaMismatch {
                    ctx : "dummy encoding (column order)",
                    expected : self.columns.len(),
                    found : columns.len()
                });
            }
        }
        let nrows = columns.first().map(|(_, v)| v.len() ).unwrap_or(0);
        let width = self.width();
        let mut out = DMatrix::zeros(nrows, width);
        let mut col_ix = 0;
        for (spec, (_, values)) in self.columns.iter().zip(columns.iter()) {
            for level in spec.levels.iter().skip(1) {
                for (i, v) in values.iter().enumerate() {
                    if v == level {
                        out[(i, col_ix)] = 1.0;
                    }
                }
                col_ix += 1;
            }
        }
        Ok(out)
    }

    /// Total dummy width: sum over columns of (levels - 1).
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.width() ).sum()
    }

    /// Generated column names, `column_level`, in emission order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for col in &self.columns {
            for level in col.levels.iter().skip(1) {
                names.push(format!("{}_{}", col.name, level));
            }
        }
        names
    }

    pub fn columns(&self) -> &[ColumnLevels] {
        &self.columns
    }

}

#[cfg(test)]
mod test {

    use super::*;

    fn col(name : &str, values : &[&str]) -> (String, Vec<String>) {
        (name.to_string(), values.iter().map(|s| s.to_string() ).collect())
    }

    #[test]
    fn width_is_levels_minus_one_per_column() {
        let cols = [
            col("protocol_type", &["tcp", "udp", "icmp", "tcp"]),
            col("flag", &["SF", "S0"])
        ];
        let spec = EncodingSpec::fit(&cols);
        assert_eq!(spec.width(), 2 + 1);
        let m = spec.transform(&cols).unwrap();
        assert_eq!(m.ncols(), 3);
        assert_eq!(m.nrows(), 4);
    }

    #[test]
    fn single_level_column_encodes_to_nothing() {
        let cols = [col("land", &["0", "0", "0"])];
        let spec = EncodingSpec::fit(&cols);
        assert_eq!(spec.width(), 0);
        let m = spec.transform(&cols).unwrap();
        assert_eq!(m.ncols(), 0);
        assert_eq!(m.nrows(), 3);
    }

    #[test]
    fn test_batch_keeps_training_columns() {
        let train = [col("protocol_type", &["tcp", "udp"])];
        let spec = EncodingSpec::fit(&train);
        assert_eq!(spec.column_names(), vec!["protocol_type_udp"]);

        // A batch with only the reference level still yields the udp column, all zeros.
        let test = [col("protocol_type", &["tcp", "tcp", "tcp"])];
        let m = spec.transform(&test).unwrap();
        assert_eq!(m.ncols(), 1);
        assert!(m.iter().all(|x| *x == 0.0 ));
    }

    #[test]
    fn column_order_is_checked() {
        let train = [col("a", &["x"]), col("b", &["y"])];
        let spec = EncodingSpec::fit(&train);
        let swapped = [col("b", &["y"]), col("a", &["x"])];
        assert!(matches!(spec.transform(&swapped), Err(Error::SchemaMismatch { .. })));
    }

}
