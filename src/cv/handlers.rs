use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::auth::extractors::SessionUser;
use crate::auth::repo::User;
use crate::body::{self, Payload};
use crate::cv::pdf::build_cv_pdf;
use crate::cv::repo::UserCv;
use crate::error::AppError;
use crate::experience::repo::Experience;
use crate::profile::repo::CvData;
use crate::session::Role;
use crate::state::AppState;
use crate::templates::sanitize;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const PDF_MAGIC: &[u8] = b"%PDF";

/// Multipart PDF upload. The file must carry a `.pdf` name, start with the
/// PDF signature and stay within the size cap; all checks run before
/// anything touches the disk.
#[instrument(skip(state, headers, raw))]
pub async fn upload_cv(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let Payload::Multipart(form) = payload else {
        return Err(AppError::MalformedBody(
            "atteso un corpo multipart/form-data".into(),
        ));
    };
    let file = form
        .file("cv_file")
        .ok_or_else(|| AppError::Validation("Nessun file selezionato".into()))?;
    validate_upload(&file.filename, &file.data)?;

    let stored_path = state
        .storage
        .save(&file.filename, file.data.clone())
        .await
        .map_err(AppError::Internal)?;
    let record = UserCv::insert(&state.db, session.user_id, &stored_path)
        .await
        .map_err(AppError::Internal)?;

    info!(
        user_id = session.user_id,
        cv_id = record.id,
        path = %stored_path,
        "cv uploaded"
    );
    Ok(Json(json!({
        "success": true,
        "message": "CV caricato con successo!",
        "file_path": stored_path,
    })))
}

/// Streams the most recent uploaded CV for a user. Open to anyone holding
/// the link, like the original.
#[instrument(skip(state))]
pub async fn download_cv(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let user_id = query
        .get("user_id")
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| AppError::Validation("Parametro user_id mancante".into()))?;

    let record = UserCv::latest_for_user(&state.db, user_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("CV non trovato".into()))?;

    let data = state.storage.read(&record.file_path).await.map_err(|e| {
        warn!(error = %e, path = %record.file_path, "stored cv missing on disk");
        AppError::NotFound("File non trovato sul server".into())
    })?;

    let filename = record
        .file_path
        .rsplit('/')
        .next()
        .unwrap_or("cv.pdf")
        .to_string();
    Ok(pdf_response(data, &format!("inline; filename=\"{filename}\"")))
}

/// Remove one uploaded CV (file + record). Owner or admin only; the id can
/// arrive as a query parameter (GET) or a body field (POST).
#[instrument(skip(state, headers, raw))]
pub async fn delete_cv(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let cv_id = query
        .get("cv_id")
        .map(|s| s.as_str())
        .or_else(|| payload.field("cv_id"))
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or_else(|| AppError::Validation("Parametro cv_id mancante".into()))?;

    let record = UserCv::find_by_id(&state.db, cv_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("CV non trovato".into()))?;

    if session.role != Role::Admin && record.user_id != session.user_id {
        return Err(AppError::NotAuthorized);
    }

    if let Err(e) = state.storage.delete(&record.file_path).await {
        // The record still goes away; a missing file is not worth a 500.
        warn!(error = %e, path = %record.file_path, "could not delete stored cv file");
    }
    UserCv::delete(&state.db, cv_id)
        .await
        .map_err(AppError::Internal)?;

    info!(user_id = session.user_id, cv_id, "cv deleted");
    Ok(Json(
        json!({ "success": true, "message": "CV eliminato con successo" }),
    ))
}

/// Render the caller's stored profile as a fresh PDF and stream it as an
/// attachment.
#[instrument(skip(state))]
pub async fn generate_cv(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
) -> Result<Response, AppError> {
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

    let bytes = build_cv_pdf(&user, &cv, &experiences).map_err(|e| {
        error!(error = %e, user_id = session.user_id, "pdf generation failed");
        AppError::Internal(e)
    })?;

    info!(user_id = session.user_id, size = bytes.len(), "cv generated");
    Ok(pdf_response(
        Bytes::from(bytes),
        &format!("attachment; filename=\"cv_{}.pdf\"", session.user_id),
    ))
}

/// All upload checks run against the in-memory bytes, before anything is
/// written to disk.
fn validate_upload(filename: &str, data: &[u8]) -> Result<(), AppError> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation("Solo file PDF sono ammessi".into()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation(
            "Il file deve essere inferiore a 5 MB".into(),
        ));
    }
    if !data.starts_with(PDF_MAGIC) {
        return Err(AppError::Validation("Il file non è un PDF valido".into()));
    }
    Ok(())
}

fn pdf_response(data: Bytes, disposition: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition.to_string()),
        ],
        data,
    )
        .into_response()
}

/// Uploaded-CV list for the user dashboard, with per-file delete buttons.
pub fn render_cv_list(files: &[UserCv]) -> String {
    if files.is_empty() {
        return r#"<p class="text-muted">Nessun CV caricato ancora.</p>"#.to_string();
    }
    let mut html = String::from(r#"<ul class="cv-list">"#);
    for cv in files {
        let name = sanitize(cv.file_path.rsplit('/').next().unwrap_or(&cv.file_path));
        html.push_str(&format!(
            r#"
        <li>
            <a href="/{path}" target="_blank">{name}</a>
            <button class="delete-cv-btn btn btn-danger btn-sm" data-cv-id="{id}">Elimina</button>
        </li>"#,
            path = cv.file_path,
            name = name,
            id = cv.id,
        ));
    }
    html.push_str("\n    </ul>");
    html
}

/// Uploaded-CV section for the admin student detail page (view/download
/// links, no delete).
pub fn render_cv_section(files: &[UserCv]) -> String {
    if files.is_empty() {
        return r#"<p class="text-muted">Nessun CV caricato.</p>"#.to_string();
    }
    let mut html = String::from(r#"<div class="cv-list">"#);
    for cv in files {
        let name = sanitize(cv.file_path.rsplit('/').next().unwrap_or(&cv.file_path));
        html.push_str(&format!(
            r#"
        <div class="cv-item">
            <p>{name} <small>({uploaded})</small></p>
            <a href="/{path}" target="_blank" class="btn btn-secondary btn-sm">Visualizza</a>
            <a href="/{path}" download class="btn btn-primary btn-sm">Scarica</a>
        </div>"#,
            name = name,
            uploaded = cv.uploaded_at.date(),
            path = cv.file_path,
        ));
    }
    html.push_str("\n    </div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(id: i32, path: &str) -> UserCv {
        UserCv {
            id,
            user_id: 1,
            file_path: path.into(),
            uploaded_at: datetime!(2024-05-01 10:00:00 UTC),
        }
    }

    #[test]
    fn upload_rejects_wrong_extension() {
        let err = validate_upload("cv.docx", b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("PDF")));
    }

    #[test]
    fn upload_rejects_oversized_files() {
        let big = vec![b'a'; MAX_FILE_SIZE + 1];
        let err = validate_upload("cv.pdf", &big).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("5 MB")));
    }

    #[test]
    fn upload_rejects_fake_pdfs_despite_extension() {
        let err = validate_upload("cv.pdf", b"MZ not a pdf").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn upload_accepts_a_small_pdf() {
        assert!(validate_upload("Cv.PDF", b"%PDF-1.7 content").is_ok());
    }

    #[test]
    fn cv_list_links_and_delete_buttons() {
        let html = render_cv_list(&[record(3, "uploads/cv/cv.pdf")]);
        assert!(html.contains(r#"href="/uploads/cv/cv.pdf""#));
        assert!(html.contains(r#"data-cv-id="3""#));
    }

    #[test]
    fn empty_cv_list_placeholder() {
        assert!(render_cv_list(&[]).contains("Nessun CV caricato"));
        assert!(render_cv_section(&[]).contains("Nessun CV caricato"));
    }

    #[test]
    fn admin_section_has_no_delete() {
        let html = render_cv_section(&[record(3, "uploads/cv/cv.pdf")]);
        assert!(html.contains("Visualizza"));
        assert!(!html.contains("delete-cv-btn"));
    }
}
