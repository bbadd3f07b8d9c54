use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::backend::SiteBackend;
use crate::ui::Icons;

pub mod routes;

/// Server state
pub struct AppState {
    pub backend: Arc<dyn SiteBackend>,
}

/// API routes plus the static pages under `static_dir`
pub fn router(backend: Arc<dyn SiteBackend>, static_dir: PathBuf) -> Router {
    let state = Arc::new(AppState { backend });

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/export", get(routes::export_data))
        .route("/api/import", post(routes::import_data))
        .route("/api/messages/{id}/like", post(routes::like_message))
        .route(
            "/api/{collection}",
            get(routes::list_records).post(routes::create_record),
        )
        .route(
            "/api/{collection}/{id}",
            put(routes::update_record).delete(routes::delete_record),
        )
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(port: u16, backend: Arc<dyn SiteBackend>, static_dir: PathBuf) -> anyhow::Result<()> {
    let backend_name = backend.name();
    let app = router(backend, static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {} ({} backend, static pages from {})", addr, backend_name, static_dir.display());
    println!("{} Server running at http://{}", Icons::GLOBE, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
