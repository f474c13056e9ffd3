//! Background reloading when a registry's source changes.
//!
//! Directory sources are watched through filesystem events (the `watch`
//! feature); a burst of events is settled for one interval and then folded
//! into a single serialized reload. Sources without a directory are polled.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{RegistryError, Result};
use crate::registry::{Registry, ReloadOutcome};

enum Signal {
    #[cfg_attr(not(feature = "watch"), allow(dead_code))]
    Changed,
    Stop,
}

/// Owns a watcher thread; dropping the handle stops and joins it.
pub struct WatchHandle {
    stop: Option<mpsc::Sender<Signal>>,
    thread: Option<JoinHandle<()>>,
    #[cfg(feature = "watch")]
    events: Option<notify::RecommendedWatcher>,
}

impl WatchHandle {
    /// Stop the watcher and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Whether changes arrive as filesystem events rather than by polling.
    pub fn is_event_driven(&self) -> bool {
        #[cfg(feature = "watch")]
        {
            self.events.is_some()
        }
        #[cfg(not(feature = "watch"))]
        {
            false
        }
    }

    fn shutdown(&mut self) {
        #[cfg(feature = "watch")]
        drop(self.events.take());
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(Signal::Stop);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("schema watcher thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("running", &self.thread.is_some())
            .field("event_driven", &self.is_event_driven())
            .finish()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Registry {
    /// Reload in the background whenever the source changes.
    ///
    /// A directory source is watched for filesystem events and reloaded once
    /// no further event has arrived for `interval`. Other sources are
    /// polled every `interval`.
    pub fn watch(&self, interval: Duration) -> Result<WatchHandle> {
        let (signal_tx, signal_rx) = mpsc::channel::<Signal>();

        #[cfg(feature = "watch")]
        let events = match self.watch_path() {
            Some(path) => {
                let signals = signal_tx.clone();
                Some(directory_watcher(path, move || {
                    let _ = signals.send(Signal::Changed);
                })?)
            }
            None => None,
        };
        #[cfg(feature = "watch")]
        let event_driven = events.is_some();
        #[cfg(not(feature = "watch"))]
        let event_driven = false;

        let registry = self.clone();
        let thread = std::thread::Builder::new()
            .name("schemagate-watch".to_string())
            .spawn(move || {
                debug!(
                    source = registry.source_label(),
                    ?interval,
                    event_driven,
                    "schema watcher started"
                );
                // Catch edits made between the load and the watch starting.
                if event_driven {
                    registry.poll();
                }
                run(&registry, &signal_rx, interval, event_driven);
                debug!(source = registry.source_label(), "schema watcher stopped");
            })
            .map_err(|err| RegistryError::Watch(err.to_string()))?;

        Ok(WatchHandle {
            stop: Some(signal_tx),
            thread: Some(thread),
            #[cfg(feature = "watch")]
            events,
        })
    }

    /// Reload on the current tokio runtime until `cancel` fires.
    ///
    /// Change detection follows [`Registry::watch`]. Source reads and
    /// compilation run on the blocking pool. Must be called from within a
    /// runtime.
    #[cfg(feature = "async")]
    pub fn watch_async(
        &self,
        interval: Duration,
        cancel: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            #[cfg(feature = "watch")]
            if let Some(path) = registry.watch_path() {
                let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
                match directory_watcher(path, move || {
                    let _ = event_tx.send(());
                }) {
                    Ok(watcher) => {
                        registry.settle_events(watcher, event_rx, interval, &cancel).await;
                        debug!(source = registry.source_label(), "async schema watcher stopped");
                        return;
                    }
                    Err(err) => warn!(error = %err, "schema directory watch unavailable; polling"),
                }
            }

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => registry.poll_blocking().await,
                }
            }
            debug!(source = registry.source_label(), "async schema watcher stopped");
        })
    }

    #[cfg(all(feature = "async", feature = "watch"))]
    async fn settle_events(
        &self,
        _watcher: notify::RecommendedWatcher,
        mut events: tokio::sync::mpsc::UnboundedReceiver<()>,
        interval: Duration,
        cancel: &tokio_util::sync::CancellationToken,
    ) {
        self.poll_blocking().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
            }
            // Wait for `interval` without further events.
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    more = tokio::time::timeout(interval, events.recv()) => match more {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    },
                }
            }
            self.poll_blocking().await;
        }
    }

    #[cfg(feature = "async")]
    async fn poll_blocking(&self) {
        let registry = self.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || registry.poll()).await {
            warn!(error = %err, "schema poll task failed");
        }
    }

    /// One watch tick: reload if the source differs from the snapshot.
    pub(crate) fn poll(&self) {
        match self.is_stale() {
            Ok(false) => {}
            Ok(true) => match self.reload() {
                Ok(ReloadOutcome::Published {
                    generation,
                    failures,
                    ..
                }) => debug!(
                    generation,
                    failures = failures.len(),
                    "watcher reloaded schemas"
                ),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "schema reload failed"),
            },
            Err(err) => warn!(error = %err, "schema source unreadable"),
        }
    }
}

/// Event-driven mode waits for a change, then for `interval` of quiet.
/// Polling mode checks the source every `interval`.
fn run(
    registry: &Registry,
    signals: &mpsc::Receiver<Signal>,
    interval: Duration,
    event_driven: bool,
) {
    let mut pending = false;
    loop {
        let signal = if event_driven && !pending {
            signals.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            signals.recv_timeout(interval)
        };
        match signal {
            Ok(Signal::Changed) => pending = true,
            Err(RecvTimeoutError::Timeout) => {
                pending = false;
                registry.poll();
            }
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Watch `path` without recursion, calling `on_change` for every event
/// that may have altered a schema file.
#[cfg(feature = "watch")]
fn directory_watcher<F>(path: &std::path::Path, on_change: F) -> Result<notify::RecommendedWatcher>
where
    F: Fn() + Send + 'static,
{
    use notify::Watcher;

    let handler = move |event: notify::Result<notify::Event>| match event {
        Ok(event) if is_content_change(&event.kind) => on_change(),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "schema directory watch error"),
    };
    let mut watcher =
        notify::recommended_watcher(handler).map_err(|err| RegistryError::Watch(err.to_string()))?;
    watcher
        .watch(path, notify::RecursiveMode::NonRecursive)
        .map_err(|err| RegistryError::Watch(format!("{}: {err}", path.display())))?;
    Ok(watcher)
}

/// Reads performed by a reload raise access events; only edits count.
#[cfg(feature = "watch")]
fn is_content_change(kind: &notify::EventKind) -> bool {
    use notify::EventKind;

    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
