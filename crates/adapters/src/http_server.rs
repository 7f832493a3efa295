//! HTTP server
//!
//! [`ServerConfig`] is built once at startup and never changes afterwards.
//! [`HttpServer`] turns it into an axum [`Router`] and serves it until the
//! shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use editserver_protocol::{ConfigError, OriginPolicy};
use editserver_runtime::{
    CommandEditor, EditPipeline, EditorCommand, EditorRunner, ExitPolicy, PipelineConfig,
};
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tracing::info;

use crate::edit_handler::{handle_edit, EditState};

/// Default bind address; all interfaces, port 8888.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";

/// Default editor command line.
pub const DEFAULT_EDITOR_COMMAND: &str = "gvim -f";

/// Largest accepted request body (16 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the edit server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Editor run for every POST request
    pub editor: EditorCommand,
    /// Policy applied to the `Origin` header
    pub origin: OriginPolicy,
    /// Directory scratch files are created in
    pub scratch_dir: PathBuf,
    /// How editor failures are treated
    pub exit_policy: ExitPolicy,
    /// Kill the editor after this long; `None` waits forever
    pub editor_timeout: Option<Duration>,
    /// Maximum number of edits in flight; `None` is unbounded
    pub max_concurrent_edits: Option<usize>,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            editor: EditorCommand::new("gvim", vec!["-f".to_string()]),
            origin: OriginPolicy::default(),
            scratch_dir: std::env::temp_dir(),
            exit_policy: ExitPolicy::default(),
            editor_timeout: None,
            max_concurrent_edits: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Reject limits that would make every request fail.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_body_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent_edits == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_edits".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.editor_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "editor_timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scratch_dir: self.scratch_dir.clone(),
            exit_policy: self.exit_policy,
        }
    }
}

/// Edit server bound to one configuration.
pub struct HttpServer {
    config: ServerConfig,
    pipeline: EditPipeline,
}

impl HttpServer {
    /// Creates a new [`HttpServer`] that runs the configured editor command.
    pub fn new(config: ServerConfig) -> Self {
        let editor = CommandEditor::new(config.editor.clone()).with_timeout(config.editor_timeout);
        Self::with_editor(config, Arc::new(editor))
    }

    /// Creates a new [`HttpServer`] that edits through `editor` instead of
    /// spawning the configured command.
    pub fn with_editor(config: ServerConfig, editor: Arc<dyn EditorRunner>) -> Self {
        let pipeline = EditPipeline::new(config.pipeline_config(), editor);
        Self { config, pipeline }
    }

    /// Access the configuration associated with this server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router. Every method on every path goes to [`handle_edit`].
    pub fn router(&self) -> Router {
        let state = Arc::new(EditState {
            pipeline: self.pipeline.clone(),
            origin: self.config.origin.clone(),
            max_body_bytes: self.config.max_body_bytes,
        });

        let router = Router::new().fallback(handle_edit).with_state(state);
        match self.config.max_concurrent_edits {
            Some(limit) => router.layer(ConcurrencyLimitLayer::new(limit)),
            None => router,
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind edit server on {}", self.config.bind_addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr().context("Listener has no local address")?;
        info!(
            editor = %self.config.editor,
            require_origin = self.config.origin.require_origin,
            "Binding edit server on {}",
            local_addr
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Edit server terminated unexpectedly")
    }
}
