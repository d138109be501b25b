//! Signup, login and logout
//!
//! Successful signup and login both start a session: the token is
//! returned in the body and set as the `session` cookie.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::session::{SESSION_COOKIE, Session, create_session_token};
use crate::AppState;
use crate::api::{AuthResponse, LoginRequest, SignupRequest, account_to_response};
use crate::data::User;
use crate::error::AppError;

/// Create authentication router
///
/// Routes:
/// - POST /auth/signup - Create identity and start a session
/// - POST /auth/login - Start a session
/// - POST /auth/logout - Clear the session cookie
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

fn build_session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<(CookieJar, AuthResponse), AppError> {
    let max_age = state.config.auth.session_max_age;
    let session = Session::new(&user.id, &user.username, max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let jar = jar.add(build_session_cookie(
        token.clone(),
        state.config.should_use_secure_cookies(),
    ));

    Ok((
        jar,
        AuthResponse {
            token,
            account: account_to_response(user),
        },
    ))
}

/// POST /auth/signup
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .accounts
        .signup(&request.username, &request.email, &request.password)
        .await?;

    let (jar, body) = start_session(&state, jar, &user)?;
    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .accounts
        .authenticate(&request.username, &request.password)
        .await?;

    tracing::info!(user_id = %user.id, "Logged in");
    let (jar, body) = start_session(&state, jar, &user)?;
    Ok((jar, Json(body)))
}

/// POST /auth/logout
///
/// Tokens are stateless; logout only clears the cookie.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
    )
}
