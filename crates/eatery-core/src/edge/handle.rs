use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::worker::{EdgeCacheConfig, EdgeStats, EdgeWorker, InstallReport, Lookup};
use super::EdgeError;
use crate::api::{HttpRequest, HttpResponse, Transport, TransportError};

/// Buffer size for the worker's command channel.
const COMMAND_BUFFER_SIZE: usize = 64;

enum Command {
    Install {
        reply: oneshot::Sender<Result<InstallReport, EdgeError>>,
    },
    Activate {
        reply: oneshot::Sender<Vec<String>>,
    },
    Fetch {
        request: HttpRequest,
        reply: oneshot::Sender<Result<HttpResponse, TransportError>>,
    },
    Store {
        url: String,
        response: HttpResponse,
    },
    Stats {
        reply: oneshot::Sender<EdgeStats>,
    },
    Shutdown {
        reply: oneshot::Sender<CacheStorage>,
    },
}

/// Handle to a running edge cache worker. Clone is cheap.
#[derive(Clone)]
pub struct EdgeCacheHandle {
    tx: mpsc::Sender<Command>,
}

impl EdgeCacheHandle {
    /// Start a worker with empty cache storage.
    pub fn spawn(config: EdgeCacheConfig, upstream: Arc<dyn Transport>) -> Self {
        Self::spawn_with_storage(config, upstream, CacheStorage::new())
    }

    /// Start a worker on storage left behind by a previous worker, the way
    /// a browser keeps caches across service worker versions.
    pub fn spawn_with_storage(
        config: EdgeCacheConfig,
        upstream: Arc<dyn Transport>,
        storage: CacheStorage,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let worker = EdgeWorker::new(config, storage, upstream);
        tokio::spawn(run(worker, rx, tx.downgrade()));
        Self { tx }
    }

    async fn call<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, EdgeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| EdgeError::Stopped)?;
        rx.await.map_err(|_| EdgeError::Stopped)
    }

    /// Run the install phase and, since the worker skips waiting, activation.
    pub async fn install(&self) -> Result<InstallReport, EdgeError> {
        self.call(|reply| Command::Install { reply }).await?
    }

    /// Returns the names of the caches that were deleted.
    pub async fn activate(&self) -> Result<Vec<String>, EdgeError> {
        self.call(|reply| Command::Activate { reply }).await
    }

    pub async fn stats(&self) -> Result<EdgeStats, EdgeError> {
        self.call(|reply| Command::Stats { reply }).await
    }

    /// Stop the worker and hand back its caches.
    pub async fn shutdown(self) -> Result<CacheStorage, EdgeError> {
        self.call(|reply| Command::Shutdown { reply }).await
    }
}

#[async_trait]
impl Transport for EdgeCacheHandle {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.call(|reply| Command::Fetch { request, reply })
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?
    }
}

async fn run(
    mut worker: EdgeWorker,
    mut rx: mpsc::Receiver<Command>,
    self_tx: mpsc::WeakSender<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Install { reply } => {
                let result = match worker.install().await {
                    Ok(precached) => Ok(InstallReport {
                        precached,
                        removed_caches: worker.activate(),
                    }),
                    Err(e) => {
                        warn!(error = %e, "Edge cache install failed");
                        Err(e)
                    }
                };
                let _ = reply.send(result);
            }
            Command::Activate { reply } => {
                let _ = reply.send(worker.activate());
            }
            Command::Fetch { request, reply } => match worker.lookup(&request) {
                Lookup::Hit(response) => {
                    let _ = reply.send(Ok(response));
                }
                Lookup::Bypass => {
                    let upstream = worker.upstream();
                    tokio::spawn(async move {
                        let _ = reply.send(upstream.send(request).await);
                    });
                }
                Lookup::Miss => {
                    // Fetch off the worker loop; the copy comes back as a
                    // Store command queued ahead of the caller's next request.
                    let upstream = worker.upstream();
                    let store_tx = self_tx.upgrade();
                    tokio::spawn(async move {
                        let url = request.url.clone();
                        let result = upstream.send(request).await;
                        if let (Ok(response), Some(tx)) = (&result, store_tx) {
                            if response.is_success() {
                                let store = Command::Store {
                                    url,
                                    response: response.clone(),
                                };
                                let _ = tx.send(store).await;
                            }
                        }
                        let _ = reply.send(result);
                    });
                }
            },
            Command::Store { url, response } => worker.store(&url, response),
            Command::Stats { reply } => {
                let _ = reply.send(worker.stats());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(worker.into_storage());
                debug!("Edge cache shut down");
                return;
            }
        }
    }
    debug!("Edge cache stopped, all handles dropped");
}
