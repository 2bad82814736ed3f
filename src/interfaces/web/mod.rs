pub(crate) mod auth;
mod handlers;
mod response;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::auth::TokenAuthenticator;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::sync::ImportSync;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sync: ImportSync,
    pub(crate) auth: TokenAuthenticator,
}

/// HTTP surface for the import consumer.
pub struct ApiServer {
    state: AppState,
    api_host: String,
    api_port: u16,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(sync: ImportSync, auth: TokenAuthenticator, api_host: String, api_port: u16) -> Self {
        Self {
            state: AppState { sync, auth },
            api_host,
            api_port,
            task: None,
        }
    }
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    fn name(&self) -> &'static str {
        "API Server"
    }

    async fn on_init(&mut self) -> Result<()> {
        info!("API Server Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.api_host, self.api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {addr}"))?;
        let app = router::build_api_router(self.state.clone());

        self.task = Some(tokio::spawn(async move {
            info!("API Server running at http://{addr}");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API Server crashed: {}", e);
            }
        }));
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server Interface shutting down...");
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}
