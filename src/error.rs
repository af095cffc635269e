use crate::http::HttpResponse;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Invalid X-CSRFToken")]
    InvalidHeaderToken,

    #[error("Invalid _csrf token")]
    InvalidFormToken,

    #[error("Bad Request")]
    MissingToken,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

impl CsrfError {
    /// HTTP status the error maps to when it terminates a request.
    pub fn status(&self) -> StatusCode {
        match self {
            CsrfError::InvalidHeaderToken
            | CsrfError::InvalidFormToken
            | CsrfError::MissingToken => StatusCode::BAD_REQUEST,
            CsrfError::Config(_) | CsrfError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Terminal response for a rejected request. The body carries the
    /// error's display text verbatim.
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::new(self.status()).with_body(self.to_string().into_bytes())
    }
}
