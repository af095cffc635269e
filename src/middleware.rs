use crate::config::{API_KEY_HEADER, COOKIE_NAME, CsrfConfig, FIELD_NAME, HEADER_NAME, TOKEN_ACTION};
use crate::context::CsrfContext;
use crate::error::CsrfError;
use crate::http::{HttpRequest, HttpResponse};
use crate::session::Session;
use crate::token;
use chrono::{Duration, Utc};
use http::Method;
use std::sync::Arc;

/// CSRF protection middleware: issues tokens on safe requests and
/// validates them on unsafe ones.
#[derive(Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
}

impl CsrfMiddleware {
    /// Create new CSRF middleware
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Run once per inbound request, before any protected handler.
    ///
    /// Always returns a context seeded with the configured secret. A token
    /// is only minted and propagated when the session resolves a string
    /// subject id, the request is a GET, and it does not carry an API key.
    /// Every failure path degrades silently: issuance on a safe request
    /// must never block the underlying response.
    pub fn issue(
        &self,
        session: &Session,
        request: &HttpRequest,
        response: &mut HttpResponse,
    ) -> CsrfContext {
        let mut context = CsrfContext::new(self.config.secret.clone());

        let Some(subject_id) = session.get::<String>(&self.config.session_key) else {
            tracing::debug!(
                session_key = %self.config.session_key,
                "no usable subject id in session, skipping issuance"
            );
            return context;
        };
        context.set_subject_id(subject_id);

        // Tokens protect browser form flows; API callers authenticate
        // through a different trust boundary.
        let api_caller = request
            .header(API_KEY_HEADER)
            .is_some_and(|value| !value.is_empty());
        if request.method != Method::GET || api_caller {
            tracing::debug!(method = %request.method, api_caller, "request not eligible for issuance");
            return context;
        }

        match request.cookie(COOKIE_NAME).filter(|value| !value.is_empty()) {
            Some(existing) => {
                // Keep the token a current page render already embeds.
                context.set_token(existing.to_string());
            }
            None => {
                let fresh =
                    token::generate(&self.config.secret, context.subject_id(), TOKEN_ACTION);
                if self.config.set_cookie {
                    response.insert_header("Set-Cookie", self.build_cookie(&fresh, request.host()));
                }
                context.set_token(fresh);
            }
        }

        if self.config.set_header {
            response.insert_header(HEADER_NAME, context.token().to_string());
        }

        context
    }

    /// Run as per-route middleware ahead of an unsafe route's handler.
    ///
    /// Looks for a candidate token in the `X-CSRFToken` header first, then
    /// the `_csrf` form field; the first channel that carries a token
    /// decides. An error return short-circuits the request; convert it with
    /// [`CsrfError::into_response`].
    pub fn validate(&self, context: &CsrfContext, request: &HttpRequest) -> Result<(), CsrfError> {
        if let Some(candidate) = request.header(HEADER_NAME).filter(|value| !value.is_empty()) {
            if !context.is_valid(candidate) {
                tracing::warn!("header token failed verification");
                return Err(CsrfError::InvalidHeaderToken);
            }
            return Ok(());
        }

        if let Some(candidate) = request.form_value(FIELD_NAME).filter(|value| !value.is_empty())
        {
            if !context.is_valid(&candidate) {
                tracing::warn!("form token failed verification");
                return Err(CsrfError::InvalidFormToken);
            }
            return Ok(());
        }

        Err(CsrfError::MissingToken)
    }

    /// Cookie line for a freshly minted token. The Domain attribute is set
    /// to the request host (port stripped) only when the host passes the
    /// hostname shape check; HttpOnly stays unset so client-side script can
    /// read the token back into forms.
    fn build_cookie(&self, token: &str, host: Option<&str>) -> String {
        let mut cookie = format!("{COOKIE_NAME}={token}; Path=/");

        if let Some(host) = host {
            let domain = host.split(':').next().unwrap_or_default();
            if is_valid_cookie_domain(domain) {
                cookie.push_str(&format!("; Domain={domain}"));
            } else {
                tracing::warn!(host, "host failed hostname check, omitting cookie domain");
            }
        }

        let expires = Utc::now() + Duration::days(1);
        cookie.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));

        if self.config.secure {
            cookie.push_str("; Secure");
        }

        cookie
    }
}

/// Permissive hostname shape check for the cookie Domain attribute: an
/// optional leading dot, then dot-separated labels of lowercase
/// alphanumerics with interior hyphens.
fn is_valid_cookie_domain(domain: &str) -> bool {
    let domain = domain.strip_prefix('.').unwrap_or(domain);
    if domain.is_empty() {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn middleware() -> CsrfMiddleware {
        CsrfMiddleware::new(
            CsrfConfig::new("token123", "user_id")
                .unwrap()
                .with_set_cookie(true)
                .with_set_header(true),
        )
    }

    fn session_with_subject() -> Session {
        let mut session = Session::new("session123");
        session.set("user_id", "123456").unwrap();
        session
    }

    #[test]
    fn test_issue_without_subject_produces_no_token() {
        let middleware = middleware();
        let session = Session::new("session123");
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session, &request, &mut response);
        assert_eq!(context.token(), "");
        assert!(response.header("Set-Cookie").is_none());
        assert!(response.header(HEADER_NAME).is_none());
    }

    #[test]
    fn test_issue_with_non_string_subject_produces_no_token() {
        let middleware = middleware();
        let mut session = Session::new("session123");
        session.set("user_id", 123456).unwrap();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session, &request, &mut response);
        assert_eq!(context.token(), "");
        assert!(response.header("Set-Cookie").is_none());
    }

    #[test]
    fn test_issue_on_get_mints_and_propagates() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert!(!context.token().is_empty());
        assert!(context.is_valid(context.token()));

        let cookie = response.header("Set-Cookie").unwrap();
        assert!(cookie.starts_with(&format!("_csrf={}", context.token())));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Expires="));
        assert!(!cookie.contains("HttpOnly"));
        assert_eq!(response.header(HEADER_NAME), Some(context.token()));
    }

    #[test]
    fn test_issue_on_post_produces_no_channels() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::POST, "/");
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert_eq!(context.token(), "");
        assert!(response.header("Set-Cookie").is_none());
        assert!(response.header(HEADER_NAME).is_none());
    }

    #[test]
    fn test_api_key_suppresses_issuance() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("X-API-Key".to_string(), "key123".to_string());
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert_eq!(context.token(), "");
        assert!(response.header("Set-Cookie").is_none());
        assert!(response.header(HEADER_NAME).is_none());
    }

    #[test]
    fn test_empty_api_key_does_not_suppress() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("X-API-Key".to_string(), String::new());
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert!(!context.token().is_empty());
    }

    #[test]
    fn test_existing_cookie_token_is_reused() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("Cookie".to_string(), "_csrf=existing-token".to_string());
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert_eq!(context.token(), "existing-token");
        // No fresh cookie, but the header channel still carries the token.
        assert!(response.header("Set-Cookie").is_none());
        assert_eq!(response.header(HEADER_NAME), Some("existing-token"));
    }

    #[test]
    fn test_empty_cookie_value_mints_fresh_token() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("Cookie".to_string(), "_csrf=".to_string());
        let mut response = HttpResponse::ok();

        let context = middleware.issue(&session_with_subject(), &request, &mut response);
        assert!(!context.token().is_empty());
        assert!(response.header("Set-Cookie").is_some());
    }

    #[test]
    fn test_cookie_domain_from_valid_host() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("Host".to_string(), "example.com:8080".to_string());
        let mut response = HttpResponse::ok();

        middleware.issue(&session_with_subject(), &request, &mut response);
        let cookie = response.header("Set-Cookie").unwrap();
        assert!(cookie.contains("Domain=example.com"));
    }

    #[test]
    fn test_cookie_domain_omitted_for_invalid_host() {
        let middleware = middleware();
        let mut request = HttpRequest::new(Method::GET, "/");
        request
            .headers
            .insert("Host".to_string(), "bad_host.example.com".to_string());
        let mut response = HttpResponse::ok();

        middleware.issue(&session_with_subject(), &request, &mut response);
        let cookie = response.header("Set-Cookie").unwrap();
        assert!(!cookie.contains("Domain="));
    }

    #[test]
    fn test_secure_flag_follows_config() {
        let middleware = CsrfMiddleware::new(
            CsrfConfig::new("token123", "user_id")
                .unwrap()
                .with_set_cookie(true)
                .with_secure(true),
        );
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();

        middleware.issue(&session_with_subject(), &request, &mut response);
        assert!(response.header("Set-Cookie").unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_validate_accepts_header_token() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        let mut post = HttpRequest::new(Method::POST, "/");
        post.headers
            .insert(HEADER_NAME.to_string(), context.token().to_string());
        assert!(middleware.validate(&context, &post).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_header_token() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        let mut post = HttpRequest::new(Method::POST, "/");
        post.headers
            .insert(HEADER_NAME.to_string(), "garbage".to_string());
        assert!(matches!(
            middleware.validate(&context, &post),
            Err(CsrfError::InvalidHeaderToken)
        ));
    }

    #[test]
    fn test_validate_header_wins_over_form() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        // Bad header, good form field: the header channel decides.
        let mut post = HttpRequest::new(Method::POST, "/");
        post.headers
            .insert(HEADER_NAME.to_string(), "garbage".to_string());
        post.body = format!("_csrf={}", context.token()).into_bytes();
        assert!(matches!(
            middleware.validate(&context, &post),
            Err(CsrfError::InvalidHeaderToken)
        ));
    }

    #[test]
    fn test_validate_accepts_form_token() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        let mut post = HttpRequest::new(Method::POST, "/");
        post.body = format!("_csrf={}", context.token()).into_bytes();
        assert!(middleware.validate(&context, &post).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_form_token() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        let mut post = HttpRequest::new(Method::POST, "/");
        post.body = b"_csrf=garbage".to_vec();
        assert!(matches!(
            middleware.validate(&context, &post),
            Err(CsrfError::InvalidFormToken)
        ));
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let middleware = middleware();
        let request = HttpRequest::new(Method::GET, "/");
        let mut response = HttpResponse::ok();
        let context = middleware.issue(&session_with_subject(), &request, &mut response);

        let post = HttpRequest::new(Method::POST, "/");
        assert!(matches!(
            middleware.validate(&context, &post),
            Err(CsrfError::MissingToken)
        ));
    }

    #[test]
    fn test_valid_cookie_domains() {
        for domain in [
            "example.com",
            ".example.com",
            "sub-domain.example.com",
            "localhost",
            "a1.b2.c3",
        ] {
            assert!(is_valid_cookie_domain(domain), "{domain:?}");
        }
    }

    #[test]
    fn test_invalid_cookie_domains() {
        for domain in [
            "",
            ".",
            "-bad.com",
            "bad-.com",
            "ex_ample.com",
            "exa mple.com",
            "Example.com",
            "two..dots.com",
        ] {
            assert!(!is_valid_cookie_domain(domain), "{domain:?}");
        }
    }
}
