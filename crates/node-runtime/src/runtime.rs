//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Connect the broker (announces `"1"`)
//! 2. Subscribe `<top>/set/#` with the [`StateBridge`]
//! 3. Mark the bridge operational (`"2"`)
//! 4. Spawn the broker loop and the metrics sampler
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to all tasks
//! 2. The broker loop announces `"0"` and disconnects
//! 3. Wait for the tasks (bounded)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use smarthome_bus::{InMemoryHub, InMemoryTransport, SmartHomeBroker};
use state_store::{StateStore, StoreStats};
use statehub_telemetry::{
    STATE_ACTIVE_WAITERS, STATE_CHANGES, STATE_DISPLACED_DELIVERIES, STATE_STORES,
    STATE_TRACKED_NAMES, STATE_WAITS,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::NodeConfig;
use crate::wiring::StateBridge;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The statehub process: a state store fed by a smart-home broker.
pub struct NodeRuntime {
    config: NodeConfig,
    store: Arc<StateStore>,
    hub: Arc<InMemoryHub>,
    broker: Arc<SmartHomeBroker>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        info!(topic = %config.broker.top_level_topic, "Creating statehub runtime");

        let store = Arc::new(StateStore::with_waiter_capacity(
            config.state.waiter_capacity,
        ));

        let mut hub = InMemoryHub::with_capacity(config.broker.channel_capacity);
        if config.broker.username.is_some() {
            hub = hub.with_credentials(config.broker.credentials());
        }
        let hub = Arc::new(hub);
        let transport = Arc::new(
            InMemoryTransport::with_hub(Arc::clone(&hub))
                .with_credentials(config.broker.credentials()),
        );

        let broker = Arc::new(
            SmartHomeBroker::new(transport, config.broker.topics())
                .with_state_store(Arc::clone(&store)),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            store,
            hub,
            broker,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start the runtime. See the module docs for the sequence.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  statehub v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.broker
            .connect()
            .await
            .context("Failed to connect broker")?;

        let actions = self.broker.topics().all_actions();
        self.broker
            .subscribe(&actions, Arc::new(StateBridge::new(Arc::clone(&self.store))))
            .await
            .with_context(|| format!("Failed to subscribe to {actions}"))?;

        self.broker
            .set_connection_state(true)
            .await
            .context("Failed to announce connection state")?;

        let broker = Arc::clone(&self.broker);
        let shutdown = self.shutdown_rx.clone();
        let broker_task = tokio::spawn(async move {
            if let Err(e) = broker.run(shutdown).await {
                error!(error = %e, "Broker loop failed");
            }
        });

        let sampler_task = tokio::spawn(sample_store_metrics(
            Arc::clone(&self.store),
            self.config.state.metrics_interval,
            self.shutdown_rx.clone(),
        ));

        self.tasks.lock().extend([broker_task, sampler_task]);

        info!(
            uri = %self.config.broker.uri,
            actions = %actions,
            "statehub running"
        );
        Ok(())
    }

    /// Shut the runtime down gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Task ended abnormally"),
                Err(_) => warn!("Task did not stop within the grace period"),
            }
        }

        info!("Shutdown complete");
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn broker(&self) -> Arc<SmartHomeBroker> {
        Arc::clone(&self.broker)
    }

    /// The hub other in-process clients attach to.
    pub fn hub(&self) -> Arc<InMemoryHub> {
        Arc::clone(&self.hub)
    }
}

/// Copy store statistics into the Prometheus metrics until shutdown.
async fn sample_store_metrics(
    store: Arc<StateStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last = StoreStats::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => last = record_store_metrics(&store, last),
            _ = shutdown.changed() => break,
        }
    }
    record_store_metrics(&store, last);
}

/// Publish the growth since `last`; returns the new baseline.
fn record_store_metrics(store: &StateStore, last: StoreStats) -> StoreStats {
    let now = store.stats();
    let delta = |current: u64, previous: u64| current.saturating_sub(previous) as f64;

    STATE_STORES.inc_by(delta(now.stores, last.stores));
    STATE_CHANGES.inc_by(delta(now.changes, last.changes));
    STATE_DISPLACED_DELIVERIES.inc_by(delta(now.displaced, last.displaced));
    STATE_WAITS
        .with_label_values(&["matched"])
        .inc_by(delta(now.waits_matched, last.waits_matched));
    STATE_WAITS
        .with_label_values(&["timed_out"])
        .inc_by(delta(now.waits_timed_out, last.waits_timed_out));

    STATE_TRACKED_NAMES.set(store.len() as f64);
    STATE_ACTIVE_WAITERS.set(store.total_waiters() as f64);
    now
}
