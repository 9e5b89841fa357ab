// SPDX-License-Identifier: AGPL-3.0-or-later

//! Runs the long-living services of the board (for now only the HTTP server) next to each other.
use std::future::Future;

use anyhow::Result;
use log::{error, info};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task;
use tokio::task::JoinHandle;
use triggered::{Listener, Trigger};

/// Resolves as soon as the service should stop.
pub type Shutdown = JoinHandle<()>;

/// Async service function receiving the shared context and its shutdown signal.
#[async_trait::async_trait]
pub trait Service<D>
where
    D: Clone + Send + Sync + 'static,
{
    async fn call(&self, context: D, shutdown: Shutdown) -> Result<()>;
}

#[async_trait::async_trait]
impl<FN, F, D> Service<D> for FN
where
    FN: Fn(D, Shutdown) -> F + Sync,
    F: Future<Output = Result<()>> + Send + 'static,
    D: Clone + Send + Sync + 'static,
{
    async fn call(&self, context: D, shutdown: Shutdown) -> Result<()> {
        (self)(context, shutdown).await
    }
}

/// Fires the exit trigger when dropped, so a panicking service still reports its exit.
#[derive(Clone)]
struct ExitGuard(Trigger);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.trigger();
    }
}

/// Starts services, reports when one of them stops and shuts them down gracefully.
///
/// A stopped service (returned, failed or panicked) usually means the board can't work properly
/// anymore, callers should then shut everything down, see [`ServiceManager::on_exit`].
pub struct ServiceManager<D>
where
    D: Clone + Send + Sync + 'static,
{
    context: D,

    exit_trigger: Trigger,

    exit_listener: Listener,

    /// Every running service holds a clone of this sender, the channel closes when all of them
    /// stopped.
    shutdown_sender: broadcast::Sender<()>,
}

impl<D> ServiceManager<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Returns a manager handing `context` to every service.
    pub fn new(context: D) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);
        let (exit_trigger, exit_listener) = triggered::trigger();

        Self {
            context,
            exit_trigger,
            exit_listener,
            shutdown_sender,
        }
    }

    /// Spawns a service.
    pub fn add<F: Service<D> + Send + Sync + Copy + 'static>(
        &mut self,
        name: &'static str,
        service: F,
    ) {
        let shutdown_sender = self.shutdown_sender.clone();
        let mut shutdown_receiver = shutdown_sender.subscribe();
        let signal = task::spawn(async move {
            let _ = shutdown_receiver.recv().await;
        });

        let exit_guard = ExitGuard(self.exit_trigger.clone());
        let context = self.context.clone();

        task::spawn(async move {
            info!("Start {} service", name);

            if let Err(err) = service.call(context, signal).await {
                error!("Error in {} service: {}", name, err);
            }

            // Announce that this service is done, on drop also after panics
            drop(shutdown_sender);
            drop(exit_guard);
        });
    }

    /// Resolves when a service stopped.
    pub async fn on_exit(&self) {
        self.exit_listener.clone().await;
    }

    /// Asks all services to stop and waits until they did.
    pub async fn shutdown(self) {
        info!("Put out the fire");

        let mut closed = self.shutdown_sender.subscribe();

        // Fails only when no service is running anymore
        let _ = self.shutdown_sender.send(());
        drop(self.shutdown_sender);

        while !matches!(closed.recv().await, Err(RecvError::Closed)) {}
    }
}
