//! ServerBuilder for fluent API to build HTTP servers

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::registry::{ResourceDescriptor, ResourceRegistry};
use crate::config::ApiConfig;
use crate::core::auth::{AuthProvider, NoAuthProvider, SharedAuthProvider};

/// Builder for creating HTTP servers exposing registered resources
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config_file("api.yaml")?
///     .with_auth_provider(HeaderAuthProvider)
///     .register(Resource::<Product, AddProductForm, ProductFilter>::new("product", factory))
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: ApiConfig,
    registry: ResourceRegistry,
    auth_provider: SharedAuthProvider,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            registry: ResourceRegistry::new(),
            auth_provider: Arc::new(NoAuthProvider),
            custom_routes: Vec::new(),
        }
    }

    /// Use `config` for the server address and resource policies
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = ApiConfig::from_yaml_file(path)?;
        Ok(self.with_config(config))
    }

    /// Resolve caller identities with `provider` (anonymous by default)
    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Arc::new(provider);
        self
    }

    /// Register a resource
    pub fn register(mut self, descriptor: impl ResourceDescriptor + 'static) -> Self {
        self.registry.register(Box::new(descriptor));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints outside the five resource operations, such as
    /// login or webhooks.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Build the final router
    ///
    /// Merges health routes, the routes of every registered resource and the
    /// custom routes, then installs the auth provider and request tracing.
    pub fn build(self) -> Router {
        for resource in &self.config.resources {
            if !self.registry.contains(&resource.name) {
                tracing::warn!(
                    resource = %resource.name,
                    "resource is configured but not registered"
                );
            }
        }

        let mut app = health_routes().merge(self.registry.build_routes(&self.config));

        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        app.layer(Extension(self.auth_provider))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on the configured address with graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.address();
        self.serve_on(&addr).await
    }

    /// Serve on `addr` with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve_on(self, addr: &str) -> Result<()> {
        let resources = self.registry.names().join(", ");
        let app = self.build();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {}", addr))?;

        tracing::info!(resources = %resources, "Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubResource;

    impl ResourceDescriptor for StubResource {
        fn name(&self) -> &str {
            "stub"
        }

        fn build_routes(&self, _config: &ApiConfig) -> Router {
            Router::new().route("/stub/list", get(|| async { "[]" }))
        }
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.registry.is_empty());
        assert!(builder.custom_routes.is_empty());
        assert_eq!(builder.config().address(), "127.0.0.1:1111");
    }

    #[test]
    fn test_register_and_custom_routes() {
        let builder = ServerBuilder::default()
            .register(StubResource)
            .with_custom_routes(Router::new())
            .with_custom_routes(Router::new());
        assert!(builder.registry.contains("stub"));
        assert_eq!(builder.custom_routes.len(), 2);
    }

    #[test]
    fn test_with_config_file_missing_fails() {
        let result = ServerBuilder::new().with_config_file("/nonexistent/api.yaml");
        let err = result.err().expect("missing file is an error");
        assert!(format!("{:#}", err).contains("cannot read config file"));
    }

    #[tokio::test]
    async fn test_build_mounts_all_routes() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let custom = Router::new().route("/custom", get(|| async { "ok" }));
        let router = ServerBuilder::new()
            .register(StubResource)
            .with_custom_routes(custom)
            .build();

        for path in ["/health", "/healthz", "/stub/list", "/custom"] {
            let request = Request::builder().uri(path).body(Body::empty()).unwrap();
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }

        let request = Request::builder().uri("/missing").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
