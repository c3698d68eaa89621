use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{admin, auth, cv, experience, pages, profile};

pub fn build_app(state: AppState) -> Router {
    let css = ServeDir::new(state.config.static_dir.join("css"));
    let js = ServeDir::new(state.config.static_dir.join("js"));
    let uploads = ServeDir::new(state.config.upload_dir.clone());

    Router::new()
        .route("/", get(pages::home))
        .route("/home", get(pages::home))
        .route("/privacy", get(pages::privacy))
        .merge(auth::router())
        .merge(profile::router())
        .merge(experience::router())
        .merge(cv::router())
        .merge(admin::router())
        .nest_service("/css", css)
        .nest_service("/js", js)
        .nest_service("/uploads/cv", uploads)
        .fallback(pages::not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
