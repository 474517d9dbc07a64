use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::auth::dto::Claims;
use crate::auth::services::SESSION_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and validates the session token, returning the caller's identity.
/// The cookie channel wins when both cookie and bearer header are present.
#[derive(Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
            Some(t) if !t.is_empty() => t,
            _ => bearer_token(parts)
                .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?,
        };

        let cfg = &state.config.jwt;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(&token, &decoding, &validation)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        Ok(AuthUser {
            id: data.claims.sub,
            username: data.claims.username,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::JwtKeys;
    use axum::extract::FromRef;
    use axum::http::{header, Request};

    fn parts_for(req: Request<()>) -> Parts {
        let (parts, _) = req.into_parts();
        parts
    }

    #[tokio::test]
    async fn accepts_bearer_header() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "kim").expect("sign");

        let mut parts = parts_for(
            Request::builder()
                .uri("/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(())
                .expect("request"),
        );

        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "kim");
    }

    #[tokio::test]
    async fn cookie_takes_precedence_over_header() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let cookie_id = Uuid::new_v4();
        let header_id = Uuid::new_v4();
        let cookie_token = keys.sign(cookie_id, "cookie-user").expect("sign");
        let header_token = keys.sign(header_id, "header-user").expect("sign");

        let mut parts = parts_for(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, format!("token={cookie_token}"))
                .header(header::AUTHORIZATION, format!("Bearer {header_token}"))
                .body(())
                .expect("request"),
        );

        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(user.id, cookie_id);
    }

    #[tokio::test]
    async fn missing_credentials_are_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_for(Request::builder().uri("/").body(()).expect("request"));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_for(
            Request::builder()
                .uri("/")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(())
                .expect("request"),
        );
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
