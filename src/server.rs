//! Router assembly and the listener loop.

use crate::config::ServiceConfig;
use crate::converter::Converter;
use crate::handler;
use crate::id::IdGenerator;
use crate::scratch;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub config: ServiceConfig,
    pub converter: Arc<dyn Converter>,
    pub ids: Arc<dyn IdGenerator>,
    /// One permit per converter process allowed to run at a time.
    pub permits: Semaphore,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        converter: Arc<dyn Converter>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let permits = Semaphore::new(config.max_concurrent_conversions);
        Self {
            config,
            converter,
            ids,
            permits,
        }
    }
}

/// Build the application router.
///
/// The body limit is applied to every route; `/convert` surfaces a breach
/// as a 400 through [`crate::upload`].
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    Router::new()
        .route("/convert", post(handler::convert_document))
        .route("/health", get(health))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Prepare the scratch directory, bind, and serve until Ctrl-C or SIGTERM.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve(
    mut config: ServiceConfig,
    converter: Arc<dyn Converter>,
    ids: Arc<dyn IdGenerator>,
) -> std::io::Result<()> {
    scratch::prepare_dir(&config.scratch_dir).await?;
    config.scratch_dir = tokio::fs::canonicalize(&config.scratch_dir).await?;

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "Listening on http://{} (scratch: {}, converter: {}, max {} concurrent)",
        listener.local_addr()?,
        config.scratch_dir.display(),
        converter.name(),
        config.max_concurrent_conversions
    );

    let app = router(Arc::new(AppState::new(config, converter, ids)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use crate::id::SequentialIds;
    use async_trait::async_trait;
    use axum_test::TestServer;
    use std::path::Path;

    struct NeverCalled;

    #[async_trait]
    impl Converter for NeverCalled {
        async fn convert(&self, _: &Path, _: &Path) -> Result<(), ConversionError> {
            panic!("converter should not run");
        }
    }

    fn test_server() -> TestServer {
        let config = ServiceConfig::builder().build().unwrap();
        let state = AppState::new(
            config,
            Arc::new(NeverCalled),
            Arc::new(SequentialIds::new("t")),
        );
        TestServer::new(router(Arc::new(state))).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let server = test_server();
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        resp.assert_text("ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = test_server();
        server.get("/nope").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn get_convert_is_405() {
        let server = test_server();
        server
            .get("/convert")
            .await
            .assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn permits_follow_config() {
        let config = ServiceConfig::builder()
            .max_concurrent_conversions(3)
            .build()
            .unwrap();
        let state = AppState::new(
            config,
            Arc::new(NeverCalled),
            Arc::new(SequentialIds::new("t")),
        );
        assert_eq!(state.permits.available_permits(), 3);
    }
}
