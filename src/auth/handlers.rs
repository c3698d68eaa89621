use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::auth::dto::{LoginForm, RegisterForm};
use crate::auth::extractors::SessionUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::body::{self, Payload};
use crate::error::AppError;
use crate::session::{clear_session_cookie, session_cookie, token_from_headers, Role, SessionIdentity};
use crate::state::AppState;
use crate::templates::Context;

#[instrument(skip(state))]
pub async fn login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let mut ctx = Context::new();
    ctx.set("error", "").set("success", "");
    Ok(Html(state.templates.render("login.html", &ctx)?))
}

#[instrument(skip(state, headers, raw))]
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Response, AppError> {
    let payload = body::parse(&headers, &raw)?;
    match authenticate(&state, &payload).await {
        Ok((identity, redirect)) => {
            let token = state.sessions.create(identity);
            Ok(redirect_with_cookie(redirect, session_cookie(&token)))
        }
        Err(AppError::Validation(message)) => {
            let mut ctx = Context::new();
            ctx.set("error", &message).set("success", "");
            Ok(Html(state.templates.render("login.html", &ctx)?).into_response())
        }
        Err(other) => Err(other),
    }
}

#[instrument(skip(state, headers, raw))]
pub async fn api_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Response, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let (identity, redirect) = authenticate(&state, &payload).await?;
    let token = state.sessions.create(identity);
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(json!({ "success": true, "redirect": redirect })),
    )
        .into_response())
}

#[instrument(skip(state))]
pub async fn register_page(
    State(state): State<AppState>,
    session: Option<SessionUser>,
) -> Result<Response, AppError> {
    if session.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let mut ctx = Context::new();
    ctx.set("error", "");
    Ok(Html(state.templates.render("register.html", &ctx)?).into_response())
}

#[instrument(skip(state, headers, raw))]
pub async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Response, AppError> {
    let payload = body::parse(&headers, &raw)?;
    match create_account(&state, &payload).await {
        Ok(()) => {
            let mut ctx = Context::new();
            ctx.set("error", "")
                .set("success", "Registrazione completata! Ora puoi accedere.");
            Ok(Html(state.templates.render("login.html", &ctx)?).into_response())
        }
        Err(AppError::Validation(message)) => {
            let mut ctx = Context::new();
            ctx.set("error", &message);
            Ok(Html(state.templates.render("register.html", &ctx)?).into_response())
        }
        Err(other) => Err(other),
    }
}

#[instrument(skip(state, headers, raw))]
pub async fn api_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    create_account(&state, &payload).await?;
    Ok(Json(
        json!({ "success": true, "message": "Registrazione completata!" }),
    ))
}

#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        state.sessions.destroy(&token);
    }
    redirect_with_cookie("/", clear_session_cookie())
}

async fn authenticate(
    state: &AppState,
    payload: &Payload,
) -> Result<(SessionIdentity, &'static str), AppError> {
    let form = LoginForm::from_payload(payload)?;

    let user = User::find_by_email(&state.db, &form.email)
        .await
        .map_err(AppError::Internal)?;
    let Some(user) = user else {
        warn!(email = %form.email, "login unknown email");
        return Err(AppError::Validation("Email o password non corretti".into()));
    };

    let ok = verify_password(&form.password, &user.password_hash).map_err(AppError::Internal)?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Validation("Email o password non corretti".into()));
    }

    let role = Role::from_str(&user.role).unwrap_or(Role::Student);
    let redirect = match role {
        Role::Admin => "/admin-dashboard",
        Role::Student => "/user-dashboard",
    };

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok((
        SessionIdentity {
            user_id: user.id,
            role,
            nome: user.nome,
            cognome: user.cognome,
        },
        redirect,
    ))
}

async fn create_account(state: &AppState, payload: &Payload) -> Result<(), AppError> {
    let form = RegisterForm::from_payload(payload)?;

    let existing = User::find_by_email(&state.db, &form.email)
        .await
        .map_err(AppError::Internal)?;
    if existing.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(AppError::Validation("Questa email è già registrata".into()));
    }

    let hash = hash_password(&form.password).map_err(AppError::Internal)?;
    let user = User::register(&state.db, &form.email, &hash, &form.nome, &form.cognome)
        .await
        .map_err(AppError::Internal)?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(())
}

fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response()
}
