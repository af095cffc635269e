use crate::error::{CsrfError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Cookie carrying the issued token.
pub const COOKIE_NAME: &str = "_csrf";

/// Request and response header carrying the token.
pub const HEADER_NAME: &str = "X-CSRFToken";

/// Hidden form field carrying the token.
pub const FIELD_NAME: &str = "_csrf";

/// Header marking a programmatic API caller; its presence suppresses
/// issuance on an otherwise eligible request.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Action label bound into every token.
pub const TOKEN_ACTION: &str = "POST";

/// Issuance configuration, built once at startup and shared read-only
/// across all requests.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Global secret every token is derived from.
    pub secret: String,

    /// Session field holding the per-user subject id.
    pub session_key: String,

    /// If true, send the token via the `X-CSRFToken` response header.
    pub set_header: bool,

    /// If true, send the token via the `_csrf` cookie.
    pub set_cookie: bool,

    /// Set the Secure flag on the issued cookie.
    pub secure: bool,
}

impl CsrfConfig {
    /// Create a new configuration. The secret must be non-empty; both
    /// delivery channels start disabled.
    pub fn new(secret: impl Into<String>, session_key: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(CsrfError::Config("secret must not be empty".to_string()));
        }

        Ok(Self {
            secret,
            session_key: session_key.into(),
            set_header: false,
            set_cookie: false,
            secure: false,
        })
    }

    /// Generate a random secret.
    pub fn generate_secret() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.r#gen();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Send tokens via the response header.
    pub fn with_set_header(mut self, set_header: bool) -> Self {
        self.set_header = set_header;
        self
    }

    /// Send tokens via the cookie.
    pub fn with_set_cookie(mut self, set_cookie: bool) -> Self {
        self.set_cookie = set_cookie;
        self
    }

    /// Set the cookie Secure flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}
