use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use despacho_core::{Actor, Role};

use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

// ============================================================================
// Actor Middleware
// ============================================================================

/// The gateway in front of us has already authenticated the caller and
/// forwards identity in headers. We trust them and only check they parse.
pub async fn actor_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let actor = actor_from_headers(req.headers())?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

pub fn actor_from_headers(headers: &axum::http::HeaderMap) -> Result<Actor, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::AuthenticationError(format!("missing {} header", name)))
    };

    let id = header(ACTOR_ID_HEADER)?;
    let role: Role = header(ACTOR_ROLE_HEADER)?
        .parse()
        .map_err(|e: despacho_core::CoreError| AppError::AuthenticationError(e.to_string()))?;

    Ok(Actor::new(id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_actor_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("luisa"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("logistica"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor, Actor::new("luisa", Role::Logistica));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("x"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("intern"));

        assert!(matches!(actor_from_headers(&headers), Err(AppError::AuthenticationError(_))));
    }
}
