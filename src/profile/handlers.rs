use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::auth::extractors::SessionUser;
use crate::auth::repo::User;
use crate::body;
use crate::cv::handlers::render_cv_list;
use crate::cv::repo::UserCv;
use crate::dates::format_date;
use crate::error::AppError;
use crate::experience::dto::{TIPO_FORMAZIONE, TIPO_LAVORO};
use crate::experience::handlers::render_experience_cards;
use crate::experience::repo::Experience;
use crate::profile::dto::ProfileForm;
use crate::profile::repo::CvData;
use crate::session::Role;
use crate::state::AppState;
use crate::templates::{sanitize, Context};

/// Student dashboard: profile fields, both experience lists and the
/// uploaded-CV history. Admins are bounced to their own dashboard.
#[instrument(skip(state))]
pub async fn user_dashboard(
    State(state): State<AppState>,
    session: Option<SessionUser>,
) -> Result<Response, AppError> {
    let Some(SessionUser(session)) = session else {
        return Ok(Redirect::to("/").into_response());
    };
    if session.role == Role::Admin {
        return Ok(Redirect::to("/").into_response());
    }

    let user = User::find_by_id(&state.db, session.user_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Utente non trovato".into()))?;
    let cv = CvData::find_by_user(&state.db, session.user_id)
        .await
        .map_err(AppError::Internal)?
        .unwrap_or_default();
    let experiences = Experience::list_by_user(&state.db, session.user_id)
        .await
        .map_err(AppError::Internal)?;
    let cv_files = UserCv::list_by_user(&state.db, session.user_id)
        .await
        .map_err(AppError::Internal)?;

    let mut ctx = Context::new();
    ctx.set("user_id", user.id)
        .set("user_nome", sanitize(&user.nome))
        .set("user_cognome", sanitize(&user.cognome))
        .set("user_email", sanitize(&user.email))
        .set_opt("telefono", cv.telefono.as_deref().map(sanitize))
        .set_opt("data_nascita", cv.data_nascita.map(format_date))
        .set_opt("citta", cv.citta.as_deref().map(sanitize))
        .set_opt("indirizzo", cv.indirizzo.as_deref().map(sanitize))
        .set_opt("nazionalita", cv.nazionalita.as_deref().map(sanitize))
        .set_opt("linkedin_url", cv.linkedin_url.as_deref().map(sanitize))
        .set_opt("cv_hobby", cv.hobby.as_deref().map(sanitize))
        .set_opt("cv_skills", cv.skills.as_deref().map(sanitize))
        .set_opt("cv_languages", cv.languages.as_deref().map(sanitize))
        .set(
            "esperienze_lavorative",
            render_experience_cards(&experiences, TIPO_LAVORO, true),
        )
        .set(
            "esperienze_formative",
            render_experience_cards(&experiences, TIPO_FORMAZIONE, true),
        )
        .set("user_cv_list", render_cv_list(&cv_files));

    Ok(Html(state.templates.render("user-dashboard.html", &ctx)?).into_response())
}

/// Upsert of the structured profile fields, plus the identity columns on
/// the users table.
#[instrument(skip(state, headers, raw))]
pub async fn update_profile(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let form = ProfileForm::from_payload(&payload)?;

    let taken = User::email_taken_by_other(&state.db, &form.email, session.user_id)
        .await
        .map_err(AppError::Internal)?;
    if taken {
        warn!(user_id = session.user_id, "profile email already in use");
        return Err(AppError::Validation("Questa email è già utilizzata".into()));
    }

    CvData::update_profile(&state.db, session.user_id, &form)
        .await
        .map_err(AppError::Internal)?;

    info!(user_id = session.user_id, "profile updated");
    Ok(Json(
        json!({ "success": true, "message": "Profilo aggiornato con successo!" }),
    ))
}

/// Free-text CV sections (hobby/skills/languages), posted by the dashboard
/// form; redirects back like the original page flow.
#[instrument(skip(state, headers, raw))]
pub async fn cv_content(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Response, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let hobby = payload.trimmed("summary");
    let skills = payload.trimmed("skills");
    let languages = payload.trimmed("languages");

    CvData::update_content(&state.db, session.user_id, &hobby, &skills, &languages)
        .await
        .map_err(AppError::Internal)?;

    info!(user_id = session.user_id, "cv content updated");
    Ok(Redirect::to("/user-dashboard").into_response())
}
