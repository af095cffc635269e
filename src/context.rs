use crate::config::TOKEN_ACTION;
use crate::token;

/// Per-request CSRF state, constructed during issuance and handed to
/// downstream validation and handler code. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct CsrfContext {
    /// Token to pass via header, cookie, or hidden form value.
    token: String,

    /// Subject id unique to the current user's session.
    subject_id: String,

    /// Secret used along with the subject id to derive the token.
    secret: String,
}

impl CsrfContext {
    pub(crate) fn new(secret: impl Into<String>) -> Self {
        Self {
            token: String::new(),
            subject_id: String::new(),
            secret: secret.into(),
        }
    }

    pub(crate) fn set_subject_id(&mut self, subject_id: String) {
        self.subject_id = subject_id;
    }

    pub(crate) fn set_token(&mut self, token: String) {
        self.token = token;
    }

    /// The current token, verbatim. Empty when no usable subject id
    /// resolved during issuance. Typically used to populate a hidden
    /// form field in a template.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Subject id the context was issued for; empty when none resolved.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Validate a candidate token against the stored secret and subject
    /// id at the current time.
    pub fn is_valid(&self, candidate: &str) -> bool {
        token::is_valid(candidate, &self.secret, &self.subject_id, TOKEN_ACTION)
    }
}
