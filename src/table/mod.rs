use std::fs;
use std::path::Path;

use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};

use crate::error::Error;
use crate::label::{self, Label};

/// How a raw attribute is typed by the schema file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Nominal
}

/// Ordered attribute declarations read from the schema file. Batches are
/// parsed strictly in this order; the label is always the final CSV field and
/// is not part of the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    columns : Vec<(String, ColumnKind)>
}

impl Schema {

    /// Parses the `kddcup.names` format: one `name: continuous.` or
    /// `name: symbolic.` line per attribute. Lines without a colon (the
    /// leading attack-subtype list) are skipped.
    pub fn parse(content : &str) -> Result<Self, Error> {
        let mut columns = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, tag) = match line.split_once(':') {
                Some(pair) => pair,
                None => continue
            };
            let tag = tag.trim().trim_end_matches('.');
            let kind = match tag {
                "continuous" => ColumnKind::Numeric,
                "symbolic" => ColumnKind::Nominal,
                other => {
                    return Err(Error::InvalidSchema(
                        format!("unrecognized type tag '{}' for column '{}'", other, name)
                    ));
                }
            };
            columns.push((name.trim().to_string(), kind));
        }
        if columns.is_empty() {
            return Err(Error::InvalidSchema("no attribute declarations found".to_string()));
        }
        Ok(Self { columns })
    }

    pub fn open<P : AsRef<Path>>(path : P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.columns.iter().map(|(n, _)| n.as_str() )
    }

    pub fn numeric_names(&self) -> Vec<String> {
        self.columns.iter()
            .filter(|(_, k)| *k == ColumnKind::Numeric )
            .map(|(n, _)| n.clone() )
            .collect()
    }

    pub fn nominal_names(&self) -> Vec<String> {
        self.columns.iter()
            .filter(|(_, k)| *k == ColumnKind::Nominal )
            .map(|(n, _)| n.clone() )
            .collect()
    }

    fn kinds(&self) -> impl Iterator<Item=&(String, ColumnKind)> {
        self.columns.iter()
    }

}

/// A parsed batch of connection records: the numeric block as a dense matrix,
/// nominal columns as string vectors, and the already-normalized label per
/// row. Built once from a CSV file and never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {

    pub numeric : DMatrix<f64>,

    pub numeric_names : Vec<String>,

    /// Nominal columns in schema order, column-major.
    pub nominal : Vec<(String, Vec<String>)>,

    pub labels : Vec<Label>

}

impl Dataset {

    /// Parses headerless CSV content against the schema. Every record must
    /// carry exactly `schema.len() + 1` fields (the trailing field is the raw
    /// label, normalized on the spot so unknown subtypes abort the load).
    pub fn from_csv(content : &str, schema : &Schema) -> Result<Self, Error> {
        let numeric_names = schema.numeric_names();
        let mut numeric_cols : Vec<Vec<f64>> = vec![Vec::new(); numeric_names.len()];
        let mut nominal : Vec<(String, Vec<String>)> = schema.nominal_names()
            .into_iter()
            .map(|n| (n, Vec::new()) )
            .collect();
        let mut labels = Vec::new();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(content.as_bytes());
        for (row_ix, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != schema.len() + 1 {
                return Err(Error::SchemaMismatch {
                    ctx : "csv record",
                    expected : schema.len() + 1,
                    found : record.len()
                });
            }
            let mut num_ix = 0;
            let mut nom_ix = 0;
            for (field, (name, kind)) in record.iter().zip(schema.kinds()) {
                match kind {
                    ColumnKind::Numeric => {
                        let value = field.trim().parse::<f64>().map_err(|e| Error::Parse {
                            row : row_ix,
                            col : name.clone(),
                            msg : e.to_string()
                        })?;
                        numeric_cols[num_ix].push(value);
                        num_ix += 1;
                    },
                    ColumnKind::Nominal => {
                        nominal[nom_ix].1.push(field.trim().to_string());
                        nom_ix += 1;
                    }
                }
            }
            let raw_label = record.get(schema.len()).unwrap_or("");
            labels.push(label::normalize(raw_label.trim())?);
        }

        let nrows = labels.len();
        let numeric = DMatrix::from_fn(nrows, numeric_cols.len(), |i, j| numeric_cols[j][i] );
        Ok(Self { numeric, numeric_names, nominal, labels })
    }

    pub fn open<P : AsRef<Path>>(path : P, schema : &Schema) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_csv(&content, schema)
    }

    pub fn nrows(&self) -> usize {
        self.labels.len()
    }

}

#[cfg(test)]
mod test {

    use super::*;

    const SCHEMA : &str = "back,buffer_overflow,ftp_write,guess_passwd.\n\
        duration: continuous.\n\
        protocol_type: symbolic.\n\
        src_bytes: continuous.\n";

    #[test]
    fn schema_skips_attack_list() {
        let schema = Schema::parse(SCHEMA).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.numeric_names(), vec!["duration", "src_bytes"]);
        assert_eq!(schema.nominal_names(), vec!["protocol_type"]);
    }

    #[test]
    fn dataset_splits_columns_by_kind() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let csv = "0,tcp,181,normal\n2,udp,239,neptune.\n";
        let data = Dataset::from_csv(csv, &schema).unwrap();
        assert_eq!(data.nrows(), 2);
        assert_eq!(data.numeric[(0, 0)], 0.0);
        assert_eq!(data.numeric[(1, 1)], 239.0);
        assert_eq!(data.nominal[0].1, vec!["tcp", "udp"]);
        assert_eq!(data.labels, vec![Label::Normal, Label::Dos]);
    }

    #[test]
    fn short_record_is_schema_mismatch() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let csv = "0,tcp,normal\n";
        match Dataset::from_csv(csv, &schema) {
            Err(Error::SchemaMismatch { expected, found, .. }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            },
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|d| d.nrows()))
        }
    }

}
