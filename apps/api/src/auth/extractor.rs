use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::session::SESSION_COOKIE;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// The authenticated user for this request.
///
/// Resolved from a `Bearer` token or the session cookie, then reloaded from
/// the store so plan changes from billing take effect immediately.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let claims = state.sessions.verify(&token)?;

        let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            AppError::Unauthorized("Your session is invalid or has expired".to_string())
        })?;

        Ok(Self(user))
    }
}

/// Reads the session token from `Authorization: Bearer` or the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_is_read() {
        let p = parts(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(session_token(&p).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_session_cookie_is_read() {
        let p = parts(&[("cookie", "theme=dark; session=tok123; other=1")]);
        assert_eq!(session_token(&p).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_bearer_takes_precedence_over_cookie() {
        let p = parts(&[("authorization", "Bearer header"), ("cookie", "session=cookie")]);
        assert_eq!(session_token(&p).as_deref(), Some("header"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert!(session_token(&parts(&[])).is_none());
        assert!(session_token(&parts(&[("cookie", "session=")])).is_none());
        assert!(session_token(&parts(&[("authorization", "Basic xyz")])).is_none());
    }
}
