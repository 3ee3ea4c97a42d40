//! Delimited dataset reader with column type inference.

use std::io::Read;
use std::path::{Path, PathBuf};

use thicket_data::{Attribute, Dataset, Sample, Schema, Value};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a labelled dataset from a delimited text file.
///
/// Expected format:
/// - Header row required; its cells name the attributes
/// - One row per sample, all rows with the same number of columns
/// - The class column is chosen by name, or is the last column
///
/// A non-class column is numeric when every one of its cells parses as a
/// finite `f64`, and categorical otherwise. The class column is always
/// categorical. Cells are trimmed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::MissingClassColumn`] | Named class column is not in the header |
/// | [`IoError::Data`] | Rows do not form a valid dataset |
#[derive(Debug, Clone)]
pub struct DelimitedReader {
    path: PathBuf,
    delimiter: u8,
    class_column: Option<String>,
}

impl DelimitedReader {
    /// Create a comma-delimited reader for the given path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b',',
            class_column: None,
        }
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Use the column with this header name as the class.
    #[must_use]
    pub fn with_class_column(mut self, name: impl Into<String>) -> Self {
        self.class_column = Some(name.into());
        self
    }

    /// Read and validate the file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        self.parse(file)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn parse<R: Read>(&self, input: R) -> Result<Dataset, IoError> {
        // flexible(true) so our own InconsistentRowLength check fires.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(input);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();
        let n_columns = header.len();
        debug!(n_columns, "read header");

        let class_index = match &self.class_column {
            Some(name) => header.iter().position(|h| h == name).ok_or_else(|| {
                IoError::MissingClassColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                }
            })?,
            None => n_columns.saturating_sub(1),
        };

        let mut records: Vec<Vec<String>> = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != n_columns {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: n_columns,
                    got: record.len(),
                });
            }
            records.push(record.iter().map(str::to_string).collect());
        }
        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let numeric: Vec<bool> = (0..n_columns)
            .map(|col| col != class_index && records.iter().all(|r| parse_finite(&r[col]).is_some()))
            .collect();
        let attributes: Vec<Attribute> = header
            .into_iter()
            .zip(&numeric)
            .map(|(name, &is_numeric)| {
                if is_numeric {
                    Attribute::numeric(name)
                } else {
                    Attribute::categorical(name)
                }
            })
            .collect();

        let data_error = |source| IoError::Data {
            path: self.path.clone(),
            source,
        };
        let schema = Schema::new(attributes, class_index).map_err(data_error)?;
        let mut dataset = Dataset::new(schema);
        for record in records {
            let values = record
                .into_iter()
                .zip(&numeric)
                .map(|(cell, &is_numeric)| match parse_finite(&cell) {
                    Some(x) if is_numeric => Value::Numeric(x),
                    _ => Value::Categorical(cell),
                })
                .collect();
            let sample = Sample::new(values, class_index).map_err(data_error)?;
            dataset.push(sample).map_err(data_error)?;
        }

        info!(
            n_rows = dataset.row_count(),
            n_columns,
            n_numeric = numeric.iter().filter(|&&n| n).count(),
            n_classes = dataset.class_value_space().len(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use thicket_data::AttributeKind;

    fn write_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_infers_column_kinds() {
        let f = write_file("age,colour,score,label\n31,red,0.5,0\n45,blue,1.5,1\n22,red,2.0,0\n");
        let ds = DelimitedReader::new(f.path()).read().unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.class_index(), 3);
        let kinds: Vec<AttributeKind> = ds.schema().attributes().iter().map(Attribute::kind).collect();
        assert_eq!(
            kinds,
            vec![
                AttributeKind::Numeric,
                AttributeKind::Categorical,
                AttributeKind::Numeric,
                AttributeKind::Categorical,
            ]
        );
        assert_eq!(ds.rows()[1].numeric(0).unwrap(), 45.0);
        assert_eq!(ds.rows()[1].class_label(), "1");
    }

    #[test]
    fn class_column_by_name() {
        let f = write_file("label,x\nyes,1.0\nno,2.0\n");
        let ds = DelimitedReader::new(f.path())
            .with_class_column("label")
            .read()
            .unwrap();
        assert_eq!(ds.class_index(), 0);
        assert_eq!(ds.class_value_space().labels().to_vec(), vec!["yes", "no"]);
    }

    #[test]
    fn numeric_class_values_stay_labels() {
        let f = write_file("x,y\n1.0,0\n2.0,1\n");
        let ds = DelimitedReader::new(f.path()).read().unwrap();
        assert_eq!(ds.class_count("0"), 1);
        assert_eq!(ds.class_count("1"), 1);
    }

    #[test]
    fn custom_delimiter_and_trimming() {
        let f = write_file("a; b; class\n 1.0; 2.0; p\n3.0 ;4.0 ; n\n");
        let ds = DelimitedReader::new(f.path())
            .with_delimiter(b';')
            .read()
            .unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows()[0].numeric(1).unwrap(), 2.0);
        assert_eq!(ds.rows()[1].class_label(), "n");
    }

    #[test]
    fn non_finite_cells_make_column_categorical() {
        let f = write_file("x,class\n1.0,a\nNaN,b\n");
        let ds = DelimitedReader::new(f.path()).read().unwrap();
        assert_eq!(ds.schema().attributes()[0].kind(), AttributeKind::Categorical);
        assert_eq!(ds.rows()[0].categorical(0).unwrap(), "1.0");
    }

    #[test]
    fn error_file_not_found() {
        let result = DelimitedReader::new(Path::new("/nonexistent/file.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_file("x,y,class\n");
        let result = DelimitedReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_file("x,y,class\n1.0,2.0,a\n1.0,b\n");
        let result = DelimitedReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, got: 2, .. })
        ));
    }

    #[test]
    fn error_missing_class_column() {
        let f = write_file("x,y\n1.0,a\n");
        let result = DelimitedReader::new(f.path())
            .with_class_column("target")
            .read();
        assert!(matches!(result, Err(IoError::MissingClassColumn { .. })));
    }
}
