use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::admin::repo::{self, StudentRow};
use crate::auth::extractors::{AdminUser, SessionUser};
use crate::auth::repo::User;
use crate::body;
use crate::cv::handlers::render_cv_section;
use crate::cv::repo::UserCv;
use crate::dates::format_date;
use crate::error::AppError;
use crate::experience::dto::{TIPO_FORMAZIONE, TIPO_LAVORO};
use crate::experience::handlers::render_experience_cards;
use crate::experience::repo::Experience;
use crate::pages::error_page;
use crate::profile::repo::CvData;
use crate::session::Role;
use crate::state::AppState;
use crate::templates::{sanitize, Context};

fn admin_or_redirect(session: Option<SessionUser>) -> Result<crate::session::Session, Response> {
    match session {
        Some(SessionUser(session)) if session.role == Role::Admin => Ok(session),
        _ => Err(Redirect::to("/").into_response()),
    }
}

/// Roster of students plus aggregate counters.
#[instrument(skip(state))]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: Option<SessionUser>,
) -> Result<Response, AppError> {
    let session = match admin_or_redirect(session) {
        Ok(s) => s,
        Err(redirect) => return Ok(redirect),
    };

    let students = repo::list_students(&state.db)
        .await
        .map_err(AppError::Internal)?;
    let stats = repo::load_stats(&state.db)
        .await
        .map_err(AppError::Internal)?;

    let mut ctx = Context::new();
    ctx.set("user_nome", sanitize(&session.nome))
        .set("user_cognome", sanitize(&session.cognome))
        .set("total_students", stats.total_students)
        .set("total_cvs", stats.students_with_cv)
        .set("total_work_exp", stats.total_work_exp)
        .set("total_edu_exp", stats.total_edu_exp)
        .set("students_rows", render_students_table(&students));

    Ok(Html(state.templates.render("admin-dashboard.html", &ctx)?).into_response())
}

/// Detail page for a single student.
#[instrument(skip(state))]
pub async fn admin_view_student(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    if let Err(redirect) = admin_or_redirect(session) {
        return Ok(redirect);
    }

    let Some(student_id) = query.get("id").and_then(|v| v.parse::<i32>().ok()) else {
        return Ok(error_page(StatusCode::BAD_REQUEST, "ID studente mancante"));
    };

    let user = User::find_by_id(&state.db, student_id)
        .await
        .map_err(AppError::Internal)?;
    let user = match user.filter(|u| u.role == Role::Student.as_str()) {
        Some(u) => u,
        None => return Ok(error_page(StatusCode::NOT_FOUND, "Studente non trovato")),
    };

    let cv = CvData::find_by_user(&state.db, student_id)
        .await
        .map_err(AppError::Internal)?
        .unwrap_or_default();
    let experiences = Experience::list_by_user(&state.db, student_id)
        .await
        .map_err(AppError::Internal)?;
    let cv_files = UserCv::list_by_user(&state.db, student_id)
        .await
        .map_err(AppError::Internal)?;

    let placeholder = || "N/A".to_string();
    let mut ctx = Context::new();
    ctx.set("student_id", user.id)
        .set("nome", sanitize(&user.nome))
        .set("cognome", sanitize(&user.cognome))
        .set("email", sanitize(&user.email))
        .set(
            "telefono",
            cv.telefono.as_deref().map(sanitize).unwrap_or_else(placeholder),
        )
        .set(
            "data_nascita",
            cv.data_nascita.map(format_date).unwrap_or_else(placeholder),
        )
        .set(
            "citta",
            cv.citta.as_deref().map(sanitize).unwrap_or_else(placeholder),
        )
        .set(
            "indirizzo",
            cv.indirizzo.as_deref().map(sanitize).unwrap_or_else(placeholder),
        )
        .set(
            "linkedin_url",
            cv.linkedin_url.as_deref().map(sanitize).unwrap_or_else(placeholder),
        )
        .set("cv_section", render_cv_section(&cv_files))
        .set(
            "esperienze_lavorative",
            render_experience_cards(&experiences, TIPO_LAVORO, false),
        )
        .set(
            "esperienze_formative",
            render_experience_cards(&experiences, TIPO_FORMAZIONE, false),
        );

    Ok(Html(state.templates.render("admin-view-student.html", &ctx)?).into_response())
}

/// Remove a student account entirely: uploaded files (best-effort), then
/// the user row with its cascading children.
#[instrument(skip(state, headers, raw))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let user_id = payload
        .field("user_id")
        .unwrap_or_default()
        .trim()
        .parse::<i32>()
        .map_err(|_| AppError::Validation("ID utente non valido".into()))?;

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Utente non trovato".into()))?;
    if user.role != Role::Student.as_str() {
        return Err(AppError::Validation(
            "Non è possibile eliminare amministratori".into(),
        ));
    }

    let cv_files = UserCv::list_by_user(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?;
    for cv in &cv_files {
        if let Err(e) = state.storage.delete(&cv.file_path).await {
            warn!(error = %e, path = %cv.file_path, "could not delete stored cv file");
        }
    }

    repo::delete_student(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?;

    info!(admin_id = admin.user_id, user_id, "student account deleted");
    Ok(Json(
        json!({ "success": true, "message": "Utente eliminato con successo" }),
    ))
}

fn render_students_table(students: &[StudentRow]) -> String {
    if students.is_empty() {
        return r#"<tr><td colspan="7" class="text-center">Nessuno studente registrato</td></tr>"#
            .to_string();
    }
    let mut html = String::new();
    for student in students {
        let cv_status = if student.has_cv { "Sì" } else { "No" };
        let nascita = student
            .data_nascita
            .map(format_date)
            .unwrap_or_else(|| "N/A".to_string());
        html.push_str(&format!(
            r#"
        <tr>
            <td>{id}</td>
            <td>{nome}</td>
            <td>{cognome}</td>
            <td>{email}</td>
            <td>{nascita}</td>
            <td>{cv_status}</td>
            <td>{esperienze}</td>
            <td>
                <a href="/admin-view-student?id={id}" class="btn btn-primary btn-sm">Visualizza</a>
                <button onclick="deleteStudent({id}, '{nome} {cognome}')" class="btn btn-danger btn-sm">Elimina</button>
            </td>
        </tr>"#,
            id = student.id,
            nome = sanitize(&student.nome),
            cognome = sanitize(&student.cognome),
            email = sanitize(&student.email),
            nascita = nascita,
            cv_status = cv_status,
            esperienze = student.total_experiences,
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roster_placeholder_row() {
        let html = render_students_table(&[]);
        assert!(html.contains("Nessuno studente registrato"));
    }

    #[test]
    fn roster_rows_carry_links_and_sanitized_names() {
        let rows = vec![StudentRow {
            id: 9,
            nome: "Mario<i>".into(),
            cognome: "Rossi".into(),
            email: "mario@test.it".into(),
            data_nascita: None,
            has_cv: true,
            total_experiences: 2,
        }];
        let html = render_students_table(&rows);
        assert!(html.contains("admin-view-student?id=9"));
        assert!(html.contains("Mario&lt;i&gt;"));
        assert!(html.contains("N/A"));
        assert!(html.contains(">Sì<"));
    }
}
