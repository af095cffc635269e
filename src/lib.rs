//! # csrf-guard
//!
//! Session-bound anti-forgery token issuance and validation.
//!
//! ## Features
//!
//! - ✅ **Keyed Tokens** - HMAC-SHA256 tokens bound to a session subject id
//! - ✅ **Time-boxed** - tamper-evident 24-hour expiry embedded in the token
//! - ✅ **Action Scoping** - a token minted for one action never validates for another
//! - ✅ **Multiple Channels** - delivery via cookie, response header, or hidden form field
//! - ✅ **API Bypass** - `X-API-Key` callers are exempt from browser-form issuance
//!
//! ## Quick Start
//!
//! ```rust
//! use csrf_guard::{CsrfConfig, CsrfMiddleware};
//!
//! // Or generate one: CsrfConfig::generate_secret()
//! let config = CsrfConfig::new("token123", "user_id")
//!     .unwrap()
//!     .with_set_cookie(true)
//!     .with_set_header(true);
//!
//! let csrf = CsrfMiddleware::new(config);
//! ```
//!
//! ## Issue and Validate
//!
//! Issuance runs on safe (GET) requests and seeds a per-request
//! [`CsrfContext`]; validation runs ahead of unsafe handlers and checks the
//! `X-CSRFToken` header first, then the `_csrf` form field.
//!
//! ```rust
//! use csrf_guard::{CsrfConfig, CsrfMiddleware, HttpRequest, HttpResponse, Session};
//! use http::Method;
//!
//! let csrf = CsrfMiddleware::new(
//!     CsrfConfig::new("token123", "user_id")
//!         .unwrap()
//!         .with_set_header(true),
//! );
//!
//! // Session state resolved by an external store.
//! let mut session = Session::new("session123");
//! session.set("user_id", "123456").unwrap();
//!
//! // Safe request: mint a token and expose it downstream.
//! let request = HttpRequest::new(Method::GET, "/protected");
//! let mut response = HttpResponse::ok();
//! let context = csrf.issue(&session, &request, &mut response);
//! assert!(!context.token().is_empty());
//!
//! // A later unsafe request echoes the token back in the header.
//! let mut post = HttpRequest::new(Method::POST, "/protected");
//! post.headers
//!     .insert("X-CSRFToken".to_string(), context.token().to_string());
//! assert!(csrf.validate(&context, &post).is_ok());
//!
//! // A request without a token is rejected with a 400.
//! let bare = HttpRequest::new(Method::POST, "/protected");
//! let response = csrf.validate(&context, &bare).unwrap_err().into_response();
//! assert_eq!(response.status.as_u16(), 400);
//! assert_eq!(response.body, b"Bad Request");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod session;
pub mod token;

pub use config::{API_KEY_HEADER, COOKIE_NAME, CsrfConfig, FIELD_NAME, HEADER_NAME, TOKEN_ACTION};
pub use context::CsrfContext;
pub use error::{CsrfError, Result};
pub use http::{HttpRequest, HttpResponse};
pub use middleware::CsrfMiddleware;
pub use session::Session;
