use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: field `{field}` is not a finite number: {value:?}")]
    MalformedNumber {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("dataset contains no records")]
    EmptyDataset,

    #[error("row {row}: field `{field}` must be a whole count: {value:?}")]
    FractionalCount {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("cluster count must be at least 1, got {0}")]
    InvalidClusterCount(usize),

    #[error("k-means fit failed: {0}")]
    Clustering(#[from] linfa_clustering::KMeansError),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
