use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::instrument;

use crate::auth::extractors::SessionUser;
use crate::error::AppError;
use crate::session::Role;
use crate::state::AppState;
use crate::templates::{sanitize, Context};

/// Homepage; shows a personalized call to action when a session is present.
#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    session: Option<SessionUser>,
) -> Result<Html<String>, AppError> {
    let (welcome_section, cta_section) = match session {
        Some(SessionUser(session)) => {
            let welcome = format!(
                "<h1>Benvenuto, {} {}</h1>\n<p>Accedi rapidamente alla tua area.</p>",
                sanitize(&session.nome),
                sanitize(&session.cognome)
            );
            let cta = match session.role {
                Role::Admin => concat!(
                    r#"<a href="/admin-dashboard" class="btn btn-primary">Vai alla Dashboard Admin</a>"#,
                    "\n",
                    r#"<a href="/logout" class="btn btn-secondary">Logout</a>"#
                )
                .to_string(),
                Role::Student => concat!(
                    r#"<a href="/user-dashboard" class="btn btn-primary">Vai alla tua Dashboard</a>"#,
                    "\n",
                    r#"<a href="/logout" class="btn btn-secondary">Logout</a>"#
                )
                .to_string(),
            };
            (welcome, cta)
        }
        None => (
            concat!(
                "<h1>Sistema Gestione CV</h1>\n",
                "<p>Gestisci facilmente il tuo curriculum e le tue esperienze.</p>"
            )
            .to_string(),
            concat!(
                r#"<a href="/login" class="btn btn-primary">Accedi</a>"#,
                "\n",
                r#"<a href="/register" class="btn btn-secondary">Registrati</a>"#
            )
            .to_string(),
        ),
    };

    let mut ctx = Context::new();
    ctx.set("welcome_section", welcome_section)
        .set("cta_section", cta_section);
    Ok(Html(state.templates.render("home.html", &ctx)?))
}

#[instrument(skip(state))]
pub async fn privacy(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.render("privacy.html", &Context::new())?))
}

/// Catch-all for unknown paths.
pub async fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND, "Pagina non trovata")
}

/// Styled inline error page, used where no template fits (missing routes,
/// bad admin lookups).
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="it">
<head>
    <meta charset="utf-8">
    <title>Errore {code}</title>
    <link rel="stylesheet" href="/css/style.css">
</head>
<body>
    <div class="auth-container">
        <div class="auth-card">
            <h1>Errore {code}</h1>
            <p>{message}</p>
            <a href="/" class="btn btn-primary">Torna alla Home</a>
        </div>
    </div>
</body>
</html>
"#,
        code = status.as_u16(),
        message = sanitize(message),
    );
    (status, Html(html)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_found_is_a_404_page() {
        let response = not_found().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_page_embeds_status_and_message() {
        let response = error_page(StatusCode::BAD_REQUEST, "ID studente mancante");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
