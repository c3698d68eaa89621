use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use serde_json::json;
use tracing::{info, instrument};

use crate::auth::extractors::SessionUser;
use crate::body;
use crate::dates::format_date;
use crate::error::AppError;
use crate::experience::dto::ExperienceForm;
use crate::experience::repo::Experience;
use crate::state::AppState;
use crate::templates::sanitize;

#[instrument(skip(state, headers, raw))]
pub async fn add_experience(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let form = ExperienceForm::parse_new(&payload)?;
    let id = Experience::insert(&state.db, session.user_id, &form)
        .await
        .map_err(AppError::Internal)?;
    info!(user_id = session.user_id, experience_id = id, "experience added");
    Ok(Json(
        json!({ "success": true, "message": "Esperienza aggiunta con successo!" }),
    ))
}

#[instrument(skip(state, headers, raw))]
pub async fn update_experience(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let id = experience_id(&payload)?;
    let form = ExperienceForm::parse_update(&payload)?;
    let found = Experience::update_owned(&state.db, session.user_id, id, &form)
        .await
        .map_err(AppError::Internal)?;
    if !found {
        return Err(AppError::NotFound(
            "Esperienza non trovata o non autorizzato".into(),
        ));
    }
    info!(user_id = session.user_id, experience_id = id, "experience updated");
    Ok(Json(
        json!({ "success": true, "message": "Esperienza aggiornata con successo!" }),
    ))
}

#[instrument(skip(state, headers, raw))]
pub async fn delete_experience(
    State(state): State<AppState>,
    SessionUser(session): SessionUser,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let payload = body::parse(&headers, &raw)?;
    let id = experience_id(&payload)?;
    let found = Experience::delete_owned(&state.db, session.user_id, id)
        .await
        .map_err(AppError::Internal)?;
    if !found {
        return Err(AppError::NotFound("Esperienza non trovata".into()));
    }
    info!(user_id = session.user_id, experience_id = id, "experience deleted");
    Ok(Json(
        json!({ "success": true, "message": "Esperienza eliminata con successo!" }),
    ))
}

fn experience_id(payload: &body::Payload) -> Result<i32, AppError> {
    let raw = payload
        .field("id")
        .or_else(|| payload.field("experience_id"))
        .unwrap_or_default();
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::Validation("ID esperienza non valido".into()))
}

/// HTML cards for one experience kind, used by the dashboards. Values are
/// sanitized here, at the point they enter markup.
pub fn render_experience_cards(experiences: &[Experience], tipo: &str, deletable: bool) -> String {
    let filtered: Vec<&Experience> = experiences.iter().filter(|e| e.tipo == tipo).collect();
    if filtered.is_empty() {
        return r#"<p class="text-muted">Nessuna esperienza aggiunta ancora.</p>"#.to_string();
    }

    let mut html = String::from(r#"<div class="experiences-list">"#);
    for exp in filtered {
        let fine = match (exp.is_current, exp.data_fine) {
            (true, _) => "In corso".to_string(),
            (false, Some(d)) => format_date(d),
            (false, None) => String::new(),
        };
        let periodo = format!("{} - {}", format_date(exp.data_inizio), fine);
        html.push_str(&format!(
            r#"
        <div class="experience-card">
            <h4>{titolo}</h4>
            <p class="company">{azienda}</p>
            <p class="period">{periodo}</p>
            <p class="description">{descrizione}</p>"#,
            titolo = sanitize(&exp.titolo),
            azienda = sanitize(&exp.azienda_istituto),
            periodo = periodo,
            descrizione = sanitize(exp.descrizione.as_deref().unwrap_or_default()),
        ));
        if deletable {
            html.push_str(&format!(
                r#"
            <button onclick="deleteExperience({id})" class="btn btn-danger btn-sm">Elimina</button>"#,
                id = exp.id,
            ));
        }
        html.push_str("\n        </div>");
    }
    html.push_str("\n    </div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample(tipo: &str, current: bool) -> Experience {
        Experience {
            id: 5,
            user_id: 1,
            tipo: tipo.into(),
            titolo: "Engineer <x>".into(),
            azienda_istituto: "Acme".into(),
            data_inizio: date!(2020 - 01 - 01),
            data_fine: if current { None } else { Some(date!(2022 - 06 - 30)) },
            is_current: current,
            descrizione: Some("Backend".into()),
        }
    }

    #[test]
    fn cards_render_period_and_sanitize_text() {
        let html = render_experience_cards(&[sample("lavoro", false)], "lavoro", true);
        assert!(html.contains("2020-01-01 - 2022-06-30"));
        assert!(html.contains("Engineer &lt;x&gt;"));
        assert!(html.contains("deleteExperience(5)"));
    }

    #[test]
    fn ongoing_entries_say_in_corso() {
        let html = render_experience_cards(&[sample("lavoro", true)], "lavoro", false);
        assert!(html.contains("2020-01-01 - In corso"));
        assert!(!html.contains("deleteExperience"));
    }

    #[test]
    fn other_kinds_are_filtered_out() {
        let html = render_experience_cards(&[sample("lavoro", true)], "formazione", true);
        assert!(html.contains("Nessuna esperienza"));
    }
}
