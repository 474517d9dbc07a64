use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, JwtKeys, LoginRequest, LogoutResponse, ProfileResponse, SignupRequest,
        },
        extractors::AuthUser,
        repo::is_unique_violation,
        repo_types::User,
        services::{
            clear_session_cookie, hash_password, is_valid_username, session_cookie,
            verify_password,
        },
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<SignupRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    payload.name = payload.name.trim().to_string();
    payload.username = payload.username.trim().to_lowercase();

    if payload.name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::Validation("Invalid username".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    // Pre-check keeps the common case friendly; the unique index still
    // backstops the race below.
    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err(ApiError::Validation("Username already exists".into()));
    }

    let hash = hash_password(&payload.password)?;

    let user = match User::create(&state.db, &payload.name, &payload.username, &hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!(username = %payload.username, "username already taken (race)");
            return Err(ApiError::Validation("Username already exists".into()));
        }
        Err(e) => return Err(ApiError::Database(e)),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    let jar = jar.add(session_cookie(token.clone(), &state.config));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    payload.username = payload.username.trim().to_lowercase();

    // Same answer whether the username is unknown or the password is wrong.
    let user = match User::find_by_username(&state.db, &payload.username).await? {
        Some(user) => user,
        None => {
            warn!(username = %payload.username, "login unknown username");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let jar = jar.add(session_cookie(token.clone(), &state.config));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

/// Clears the cookie channel only. Already-issued tokens stay valid until
/// natural expiry.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    (
        jar.remove(clear_session_cookie()),
        Json(LogoutResponse { success: true }),
    )
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let record = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user.id, "token references missing user");
            ApiError::NotFound("User not found".into())
        })?;

    Ok(Json(ProfileResponse {
        success: true,
        user: record.into(),
    }))
}
