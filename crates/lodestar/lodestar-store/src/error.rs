#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed attribute document")]
    Attributes(#[from] serde_json::Error),

    #[error("store schema v{found} is newer than supported v{supported}")]
    SchemaTooNew { found: i64, supported: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;
