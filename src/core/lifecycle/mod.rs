use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, PartialEq)]
pub enum LifecycleState {
    Init,
    ConnectChannels,
    Ready,
    Shutdown,
}

#[async_trait::async_trait]
pub trait LifecycleComponent {
    /// Label used in lifecycle logs.
    fn name(&self) -> &'static str;

    async fn on_init(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

type SharedComponent = Arc<Mutex<dyn LifecycleComponent + Send + Sync>>;

/// Drives attached components through init, start and shutdown.
///
/// Components start in attachment order and stop in reverse. If one fails to
/// start, the ones already started are shut down before the error is returned.
pub struct LifecycleManager {
    state: LifecycleState,
    components: Vec<SharedComponent>,
    started: usize,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Init,
            components: Vec::new(),
            started: 0,
        }
    }

    pub fn attach(&mut self, component: SharedComponent) {
        self.components.push(component);
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Lifecycle Phase: Init");
        self.state = LifecycleState::Init;
        for comp in &self.components {
            comp.lock().await.on_init().await?;
        }

        info!("Lifecycle Phase: Connect Channels");
        self.state = LifecycleState::ConnectChannels;
        for idx in 0..self.components.len() {
            let result = {
                let mut comp = self.components[idx].lock().await;
                match comp.on_start().await {
                    Ok(()) => Ok(()),
                    Err(e) => Err((comp.name(), e)),
                }
            };
            match result {
                Ok(()) => self.started = idx + 1,
                Err((name, e)) => {
                    error!("{} failed to start: {}", name, e);
                    self.shutdown().await;
                    return Err(e);
                }
            }
        }

        info!("Lifecycle Phase: Ready");
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Stops every started component. Individual failures are logged and
    /// do not prevent the rest from stopping.
    pub async fn shutdown(&mut self) {
        info!("Lifecycle Phase: Shutdown");
        self.state = LifecycleState::Shutdown;

        for comp in self.components[..self.started].iter().rev() {
            let mut comp = comp.lock().await;
            if let Err(e) = comp.on_shutdown().await {
                warn!("{} shutdown error: {}", comp.name(), e);
            }
        }
        self.started = 0;
    }
}
