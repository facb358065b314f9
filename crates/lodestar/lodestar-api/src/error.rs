#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected response shape")]
    Decode(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;
