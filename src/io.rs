//! Delimited dataset tables.
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::dataset::Dataset;
use crate::error::{DecoderError, Result};

/// Read a headed CSV table into a [`Dataset`].
///
/// `label_col` holds non-negative integer classes and `group_col` integer
/// group ids; every other column is a numeric feature, in file order.
pub fn read_dataset_csv<P: AsRef<Path>>(path: P, label_col: &str, group_col: &str) -> Result<Dataset> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let find = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            DecoderError::Shape(format!("column '{}' not found in {}", name, path.display()))
        })
    };
    let label_idx = find(label_col)?;
    let group_idx = find(group_col)?;
    let feature_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != label_idx && i != group_idx)
        .collect();

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut groups = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let parse_err = |i: usize| {
            DecoderError::Shape(format!(
                "row {}: cannot parse '{}' in column '{}'",
                line + 1,
                field(i),
                &headers[i]
            ))
        };
        labels.push(field(label_idx).parse::<usize>().map_err(|_| parse_err(label_idx))?);
        groups.push(field(group_idx).parse::<i64>().map_err(|_| parse_err(group_idx))?);
        for &i in &feature_idx {
            features.push(field(i).parse::<f64>().map_err(|_| parse_err(i))?);
        }
    }

    let n_rows = labels.len();
    let x = Array2::from_shape_vec((n_rows, feature_idx.len()), features)?;
    log::info!(
        "Read {} rows with {} features from {}",
        n_rows,
        feature_idx.len(),
        path.display()
    );
    Dataset::new(x, Array1::from(labels), Array1::from(groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_features_labels_and_groups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f1,label,f2,session").unwrap();
        writeln!(file, "0.5,1,2.0,3").unwrap();
        writeln!(file, "-1.5,0,4.0,7").unwrap();
        file.flush().unwrap();

        let dataset = read_dataset_csv(file.path(), "label", "session").unwrap();
        assert_eq!(dataset.n_samples(), 2);
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.x[[1, 0]], -1.5);
        assert_eq!(dataset.x[[0, 1]], 2.0);
        assert_eq!(dataset.y.to_vec(), vec![1, 0]);
        assert_eq!(dataset.groups.to_vec(), vec![3, 7]);
    }

    #[test]
    fn missing_label_column_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "f1,group").unwrap();
        writeln!(file, "0.5,1").unwrap();
        file.flush().unwrap();
        let err = read_dataset_csv(file.path(), "label", "group").unwrap_err();
        assert!(err.to_string().contains("label"));
    }
}
