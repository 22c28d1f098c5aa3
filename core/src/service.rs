// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;

/// A handle passed to background tasks that lets them observe a stop request.
///
/// Workers either race [`StopHandle::signaled`] against their own futures in
/// `select!`, or check [`StopHandle::is_signaled`] at the top of a loop. Both
/// can be mixed; once a stop is observed it stays observed.
pub struct StopHandle {
    shutdown_rx: oneshot::Receiver<()>,
    stopped: bool,
}

impl StopHandle {
    fn new(shutdown_rx: oneshot::Receiver<()>) -> Self {
        Self { shutdown_rx, stopped: false }
    }

    /// Resolves once a stop was requested or the owning [`ServiceHandle`] was dropped.
    ///
    /// # Example
    /// ```rust
    /// use musicfig_core::service::spawn_service;
    ///
    /// async fn run_service() {
    ///     let service_handle = spawn_service(move |mut stop_handle| async move {
    ///         stop_handle.signaled().await;
    ///     });
    ///     service_handle.shutdown().await.unwrap();
    /// }
    /// ```
    pub async fn signaled(&mut self) {
        if self.stopped {
            return;
        }
        (&mut self.shutdown_rx).await.unwrap_or_default();
        self.stopped = true;
    }

    /// Non-blocking check for a pending stop request.
    pub fn is_signaled(&mut self) -> bool {
        if !self.stopped {
            match self.shutdown_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => self.stopped = true,
            }
        }
        self.stopped
    }
}

#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("service task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("service did not stop within {0:?} and was aborted")]
    TimedOut(Duration),
}

/// Owner side of a task started with [`spawn_service`].
pub struct ServiceHandle {
    join: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServiceHandle {
    pub fn new(join: JoinHandle<()>, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self { join, shutdown_tx: Some(shutdown_tx) }
    }

    /// Signals the task to stop. Calling it again does nothing.
    pub fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task to end on its own.
    pub async fn await_join(self) -> Result<(), tokio::task::JoinError> {
        self.join.await
    }

    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        self.request_shutdown();
        self.await_join().await
    }

    /// Like [`ServiceHandle::shutdown`] but gives the task at most `timeout`
    /// to finish. A task still running after that is aborted.
    pub async fn shutdown_timeout(mut self, timeout: Duration) -> Result<(), ShutdownError> {
        self.request_shutdown();
        match tokio::time::timeout(timeout, &mut self.join).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.join.abort();
                Err(ShutdownError::TimedOut(timeout))
            }
        }
    }
}

/// Runs `f` on the tokio runtime, handing it the [`StopHandle`] paired with
/// the returned [`ServiceHandle`].
pub fn spawn_service<Fut, Func>(f: Func) -> ServiceHandle
where
    Fut: Future<Output=()> + Send + 'static,
    Func: FnOnce(StopHandle) -> Fut + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(f(StopHandle::new(shutdown_rx)));
    ServiceHandle::new(join, shutdown_tx)
}

/// The set of long-running services of one process, stopped together.
#[derive(Default)]
pub struct MultiServiceHandle {
    handles: Vec<ServiceHandle>,
}

impl MultiServiceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { handles: Vec::with_capacity(capacity) }
    }

    pub fn add(&mut self, handle: ServiceHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals every service first, then joins them in the order they were
    /// added. All services are joined even if one failed; the first failure
    /// is returned.
    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        self.handles.iter_mut().for_each(ServiceHandle::request_shutdown);
        let mut result = Ok(());
        for handle in self.handles {
            let joined = handle.await_join().await;
            if result.is_ok() {
                result = joined;
            }
        }
        result
    }
}
