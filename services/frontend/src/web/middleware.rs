//! services/frontend/src/web/middleware.rs
//!
//! Session middleware: forwards the caller's bearer token to the handlers.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use leafscan_core::SessionToken;

/// The session token of the current request, if any.
///
/// A missing token is not rejected here; the pipeline reports it as
/// `unauthenticated` without contacting the backend.
#[derive(Clone, Debug, Default)]
pub struct SessionContext(pub Option<SessionToken>);

impl SessionContext {
    pub fn token(&self) -> Option<&SessionToken> {
        self.0.as_ref()
    }
}

/// Reads `Authorization: Bearer <token>` into a [`SessionContext`] extension.
pub async fn session_context(mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .and_then(SessionToken::new);

    req.extensions_mut().insert(SessionContext(token));
    next.run(req).await
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}
