use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::AppError;
use crate::session::{token_from_headers, Role, Session};
use crate::state::AppState;

/// Route metadata "requires an active session", expressed as an extractor.
/// Rejection is the API-style 401 JSON error; browser-facing pages take
/// `Option<SessionUser>` and redirect instead.
#[derive(Debug)]
pub struct SessionUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AppError::NotAuthenticated)?;
        let session = state
            .sessions
            .lookup(&token)
            .ok_or(AppError::NotAuthenticated)?;
        Ok(SessionUser(session))
    }
}

/// Route metadata "requires role = admin". 401 without a session, 403 for a
/// non-admin one.
#[derive(Debug)]
pub struct AdminUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(session) = SessionUser::from_request_parts(parts, state).await?;
        if session.role != Role::Admin {
            return Err(AppError::NotAuthorized);
        }
        Ok(AdminUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{session_cookie, SessionIdentity};
    use axum::http::Request;

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(c) = cookie {
            builder = builder.header(axum::http::header::COOKIE, c);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn login(state: &AppState, role: Role) -> String {
        state.sessions.create(SessionIdentity {
            user_id: 1,
            role,
            nome: "Mario".into(),
            cognome: "Rossi".into(),
        })
    }

    #[tokio::test]
    async fn session_user_requires_a_cookie() {
        let state = AppState::fake();
        let mut parts = parts_with_cookie(None);
        let result = SessionUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AppError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn session_user_accepts_a_live_session() {
        let state = AppState::fake();
        let token = login(&state, Role::Student);
        let cookie = session_cookie(&token);
        let header = cookie.split(';').next().unwrap().to_string();

        let mut parts = parts_with_cookie(Some(&header));
        let SessionUser(session) = SessionUser::from_request_parts(&mut parts, &state)
            .await
            .expect("session should be accepted");
        assert_eq!(session.user_id, 1);
    }

    #[tokio::test]
    async fn admin_user_rejects_students() {
        let state = AppState::fake();
        let token = login(&state, Role::Student);
        let header = format!("session_id={token}");

        let mut parts = parts_with_cookie(Some(&header));
        let result = AdminUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AppError::NotAuthorized)));
    }

    #[tokio::test]
    async fn admin_user_accepts_admins() {
        let state = AppState::fake();
        let token = login(&state, Role::Admin);
        let header = format!("session_id={token}");

        let mut parts = parts_with_cookie(Some(&header));
        assert!(AdminUser::from_request_parts(&mut parts, &state).await.is_ok());
    }
}
