use std::io::Read;
use std::path::Path;

use crate::error::{AnalyticsError, Result};
use crate::models::RawRecord;

pub fn load_csv(csv_path: &Path) -> Result<Vec<RawRecord>> {
    let reader = csv::Reader::from_path(csv_path).map_err(|source| AnalyticsError::SourceRead {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let rows = read_rows(reader).map_err(|source| AnalyticsError::SourceRead {
        path: csv_path.to_path_buf(),
        source,
    })?;
    tracing::info!(rows = rows.len(), path = %csv_path.display(), "loaded source rows");
    Ok(rows)
}

/// Reads rows from any CSV byte stream with a header line. Missing columns
/// come back as `None`; unknown columns are ignored.
pub fn load_from_reader<R: Read>(input: R) -> Result<Vec<RawRecord>> {
    read_rows(csv::Reader::from_reader(input)).map_err(|source| AnalyticsError::SourceRead {
        path: "<reader>".into(),
        source,
    })
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> std::result::Result<Vec<RawRecord>, csv::Error> {
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawRecord>() {
        rows.push(result?);
    }
    Ok(rows)
}
