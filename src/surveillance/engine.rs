//! Surveillance engine - start/stop control around the loop
//!
//! At most one loop runs at a time. Stop requests travel over a watch channel
//! and are honoured between cycles; a fatal upstream rejection ends the loop
//! and is published on the shutdown signal.

use anyhow::Result as AnyResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::monitor::{SurveillanceLoop, SurveillanceSettings};
use crate::config::AppConfig;
use crate::error::{EngineError, FetchError};
use crate::exchange::{venue_for, ExchangeClient, ReqwestTransport, RetryPolicy, Venue};
use crate::notifier::{build_notifier, Notifier};
use crate::types::AlertEvent;

const ALERT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    /// Baseline is loading; a stop sent now ends the loop after its first cycle
    Starting,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { baseline_symbols: usize },
    AlreadyRunning,
}

/// Why the process should exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An operator asked for it
    Requested { by: String },
    /// The exchange rejected a request and the loop aborted
    UpstreamRejected(String),
}

struct EngineInner {
    settings: Arc<SurveillanceSettings>,
    client: Arc<ExchangeClient>,
    venue: Arc<dyn Venue>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<LoopState>,
    stop_tx: StdMutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<Result<u64, FetchError>>>>,
    alerts: broadcast::Sender<AlertEvent>,
    shutdown: watch::Sender<Option<ShutdownReason>>,
    cycles: Arc<AtomicU64>,
}

impl EngineInner {
    fn set_state(&self, state: LoopState) {
        if let Ok(mut current) = self.state.write() {
            *current = state;
        }
    }
}

/// Cheap-to-clone handle on the surveillance engine
#[derive(Clone)]
pub struct SurveillanceEngine {
    inner: Arc<EngineInner>,
}

impl SurveillanceEngine {
    pub fn new(
        settings: SurveillanceSettings,
        client: Arc<ExchangeClient>,
        venue: Arc<dyn Venue>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (alerts, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(None);

        Self {
            inner: Arc::new(EngineInner {
                settings: Arc::new(settings),
                client,
                venue,
                notifier,
                state: RwLock::new(LoopState::Idle),
                stop_tx: StdMutex::new(None),
                task: Mutex::new(None),
                alerts,
                shutdown,
                cycles: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Wire the engine from configuration: reqwest transport, retry policy,
    /// venue and notifier
    pub fn from_config(config: &AppConfig) -> AnyResult<Self> {
        let exchange = &config.exchange;

        let transport = ReqwestTransport::new(Duration::from_millis(exchange.request_timeout_ms))?;
        let policy = RetryPolicy {
            max_attempts: exchange.max_attempts,
            base_delay: Duration::from_millis(exchange.backoff_base_ms),
            max_delay: Duration::from_millis(exchange.backoff_max_ms),
            jitter_ratio: exchange.jitter_ratio,
        };
        let client = Arc::new(ExchangeClient::new(
            Arc::new(transport),
            policy,
            exchange.on_rejection,
        ));
        let venue = venue_for(exchange.venue, exchange.base_url.as_deref());
        let notifier = build_notifier(&config.notifier)?;

        Ok(Self::new(
            SurveillanceSettings::from_config(config),
            client,
            venue,
            notifier,
        ))
    }

    pub fn state(&self) -> LoopState {
        self.inner
            .state
            .read()
            .map(|state| *state)
            .unwrap_or(LoopState::Stopped)
    }

    /// Starting or running
    pub fn is_running(&self) -> bool {
        matches!(self.state(), LoopState::Starting | LoopState::Running)
    }

    /// Cycles completed since the engine was created, across restarts
    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    /// Every alert raised from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.inner.alerts.subscribe()
    }

    /// Becomes `Some` once the process is expected to exit
    pub fn shutdown_signal(&self) -> watch::Receiver<Option<ShutdownReason>> {
        self.inner.shutdown.subscribe()
    }

    /// Load a fresh baseline and spawn the loop. A no-op while a loop is running.
    pub async fn start_surveillance(&self) -> Result<StartOutcome, EngineError> {
        let mut task = self.inner.task.lock().await;

        if self.is_running() {
            warn!("Surveillance already running, ignoring start");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let previous = self.state();
        let (stop_tx, stop_rx) = watch::channel(false);
        if let Ok(mut slot) = self.inner.stop_tx.lock() {
            *slot = Some(stop_tx);
        }
        self.inner.set_state(LoopState::Starting);

        let mut surveillance = SurveillanceLoop::new(
            self.inner.settings.clone(),
            self.inner.client.clone(),
            self.inner.venue.clone(),
            self.inner.notifier.clone(),
            self.inner.alerts.clone(),
        );

        let baseline_symbols = match surveillance.load_baseline().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to load baseline snapshot");
                if let Ok(mut slot) = self.inner.stop_tx.lock() {
                    *slot = None;
                }
                self.inner.set_state(previous);
                self.inner
                    .shutdown
                    .send_replace(Some(ShutdownReason::UpstreamRejected(e.to_string())));
                return Err(e.into());
            }
        };

        self.inner.set_state(LoopState::Running);

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            let result = surveillance.run(stop_rx, inner.cycles.clone()).await;
            inner.set_state(LoopState::Stopped);

            if let Err(e) = &result {
                error!(error = %e, "Surveillance aborted");
                inner
                    .shutdown
                    .send_replace(Some(ShutdownReason::UpstreamRejected(e.to_string())));
            }
            result
        }));

        info!(
            exchange = %self.inner.venue.exchange(),
            symbols = baseline_symbols,
            interval_secs = self.inner.settings.poll_interval.as_secs(),
            "🚀 Surveillance started"
        );

        Ok(StartOutcome::Started { baseline_symbols })
    }

    /// Ask the loop to stop after its current cycle, or after the first one
    /// when it is still starting. Returns false when nothing was running.
    pub fn stop_surveillance(&self) -> bool {
        if !self.is_running() {
            return false;
        }

        match self.inner.stop_tx.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(stop_tx) => {
                    stop_tx.send_replace(true);
                    info!("Stop requested, finishing current cycle");
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Wait until the current loop (if any) has exited
    pub async fn wait_stopped(&self) -> Result<u64, EngineError> {
        let task = self.inner.task.lock().await.take();

        match task {
            Some(task) => Ok(task.await??),
            None => Ok(0),
        }
    }

    /// "Starting <mention> !" on the update channel, then start
    pub async fn start_requested(&self, mention: &str) -> Result<StartOutcome, EngineError> {
        self.say(&format!("Starting {} !", mention)).await;
        self.start_surveillance().await
    }

    /// "Stopping <mention> !" on the update channel, then stop
    pub async fn stop_requested(&self, mention: &str) -> bool {
        self.say(&format!("Stopping {} !", mention)).await;
        self.stop_surveillance()
    }

    async fn say(&self, text: &str) {
        self.inner
            .notifier
            .notify(&self.inner.settings.update_channel, text)
            .await;
    }

    /// "Hello <mention> !" on the update channel
    pub async fn greet(&self, mention: &str) {
        self.say(&format!("Hello {} !", mention)).await;
    }

    /// Say goodbye, stop the loop and publish a shutdown request
    pub async fn shutdown_process(&self, mention: &str) {
        self.say(&format!("Bye {}!", mention)).await;

        self.stop_surveillance();
        info!(by = %mention, "Shutdown requested");
        self.inner
            .shutdown
            .send_replace(Some(ShutdownReason::Requested {
                by: mention.to_string(),
            }));
    }
}
