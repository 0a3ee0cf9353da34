// crates/poller/src/poller.rs
//! Central owner of poll subscriptions and the server registry.
//!
//! One [`Poller`] multiplexes any number of targets. Each watched target gets
//! its own tokio task: an immediate fetch, then a fixed-interval loop. A task
//! stops when its target reports not-found/unreachable or when the user
//! unwatches it; one target's failure never affects another, and no poll
//! error is fatal to the poller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tracing::{debug, info, warn};

use corb_dash_types::JobDoc;

use crate::client::{FetchError, MetricsClient};
use crate::config::PollerConfig;
use crate::error::PollerError;
use crate::registry::{JobSnapshot, ServerRegistry};
use crate::target::Target;

/// Registry change broadcast to presentation subscribers.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A job's snapshot was replaced (poll or command response).
    JobUpdated { snapshot: JobSnapshot },
    /// A target reported not-found/unreachable; its subscription stopped.
    /// The job's last snapshot stays in the registry, progress frozen.
    TargetGone { target: Target },
}

type SubscriptionMap = Arc<Mutex<HashMap<Target, SubscriptionHandle>>>;

/// Cancellation handle for one target's poll loop. Dropping it (removal from
/// the subscription map) stops the loop at the next select point, so stopping
/// an already-stopped subscription is inherently a no-op.
struct SubscriptionHandle {
    _stop: oneshot::Sender<()>,
}

/// The metrics poller/reconciler.
///
/// Exclusively owns all subscriptions and the [`ServerRegistry`]; readers get
/// snapshot clones and broadcast events, never direct mutation.
pub struct Poller {
    config: PollerConfig,
    client: MetricsClient,
    registry: Arc<RwLock<ServerRegistry>>,
    subscriptions: SubscriptionMap,
    /// Per-job command latch: a second pause/thread command while one is
    /// outstanding is rejected instead of racing it.
    commands_in_flight: Arc<Mutex<HashSet<String>>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Poller {
    pub fn new(config: PollerConfig) -> Result<Self, reqwest::Error> {
        let client = MetricsClient::new(&config)?;
        let (events, _) = broadcast::channel(256);
        Ok(Self {
            config,
            client,
            registry: Arc::new(RwLock::new(ServerRegistry::new())),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            commands_in_flight: Arc::new(Mutex::new(HashSet::new())),
            events,
        })
    }

    /// Subscribe to registry change events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// All snapshots in display order.
    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        self.registry.read().await.snapshots()
    }

    /// Latest snapshot for one job key.
    pub async fn snapshot(&self, key: &str) -> Option<JobSnapshot> {
        self.registry.read().await.get(key).cloned()
    }

    /// The user-editable pending thread count for a job.
    pub async fn pending_threads(&self, key: &str) -> Option<u32> {
        self.registry.read().await.pending_threads(key)
    }

    /// Targets with a live subscription.
    pub async fn watched_targets(&self) -> Vec<Target> {
        self.subscriptions.lock().await.keys().cloned().collect()
    }

    /// Start polling a target. A target already being watched is left alone;
    /// at most one subscription per target.
    pub async fn watch(&self, target: Target) {
        let mut subs = self.subscriptions.lock().await;
        if subs.contains_key(&target) {
            debug!(peer = %target, "already watching");
            return;
        }
        let (stop_tx, stop_rx) = oneshot::channel();
        subs.insert(target.clone(), SubscriptionHandle { _stop: stop_tx });
        drop(subs);

        info!(peer = %target, "starting poll subscription");
        tokio::spawn(poll_loop(
            target,
            stop_rx,
            self.client.clone(),
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.subscriptions),
            self.events.clone(),
        ));
    }

    /// Start polling several targets, collapsing duplicates.
    pub async fn watch_all(&self, targets: impl IntoIterator<Item = Target>) {
        for target in targets {
            self.watch(target).await;
        }
    }

    /// Stop polling a target. Idempotent; the last snapshot stays visible.
    pub async fn unwatch(&self, target: &Target) {
        if self.subscriptions.lock().await.remove(target).is_some() {
            info!(peer = %target, "subscription removed");
        }
    }

    /// Toggle a job between paused and running, based on its last known
    /// state. The local flip is broadcast immediately for responsive display
    /// and then overwritten by the authoritative command response.
    ///
    /// A subscription that already stopped (completed job) is not resumed by
    /// this; only an explicit [`watch`](Self::watch) restarts polling.
    pub async fn pause_resume(&self, key: &str) -> Result<JobSnapshot, PollerError> {
        self.acquire_latch(key).await?;
        let result = self.pause_resume_inner(key).await;
        self.release_latch(key).await;
        result
    }

    /// Submit a new thread count for a job. Values outside the configured
    /// bounds are rejected before anything goes on the wire.
    pub async fn update_thread_count(
        &self,
        key: &str,
        threads: u32,
    ) -> Result<JobSnapshot, PollerError> {
        let bounds = &self.config.thread_bounds;
        if !bounds.contains(&threads) {
            return Err(PollerError::ThreadCountOutOfRange {
                value: threads,
                min: *bounds.start(),
                max: *bounds.end(),
            });
        }
        self.acquire_latch(key).await?;
        let result = self.update_thread_count_inner(key, threads).await;
        self.release_latch(key).await;
        result
    }

    async fn pause_resume_inner(&self, key: &str) -> Result<JobSnapshot, PollerError> {
        let (target, currently_paused) = {
            let registry = self.registry.read().await;
            let snap = registry.get(key).ok_or_else(|| PollerError::UnknownJob {
                key: key.to_string(),
            })?;
            (snap.origin.clone(), snap.doc.paused)
        };

        // Optimistic flip, reconciled by the response (and by the next poll).
        {
            let mut registry = self.registry.write().await;
            let flipped = registry.get(key).map(|snap| {
                let mut doc = snap.doc.clone();
                doc.paused = !currently_paused;
                doc
            });
            if let Some(doc) = flipped {
                for snapshot in registry.merge(vec![doc], &target) {
                    let _ = self.events.send(RegistryEvent::JobUpdated { snapshot });
                }
            }
        }

        let payload = self.client.pause_resume(&target, currently_paused).await?;
        self.merge_and_broadcast(payload.into_jobs(), &target, key).await
    }

    async fn update_thread_count_inner(
        &self,
        key: &str,
        threads: u32,
    ) -> Result<JobSnapshot, PollerError> {
        let target = {
            let mut registry = self.registry.write().await;
            let origin = registry
                .get(key)
                .ok_or_else(|| PollerError::UnknownJob {
                    key: key.to_string(),
                })?
                .origin
                .clone();
            registry.set_pending_threads(key, threads);
            origin
        };

        let payload = self.client.set_thread_count(&target, threads).await?;
        self.merge_and_broadcast(payload.into_jobs(), &target, key).await
    }

    /// Merge a command response exactly like a poll response and return the
    /// snapshot for `key`.
    async fn merge_and_broadcast(
        &self,
        jobs: Vec<JobDoc>,
        target: &Target,
        key: &str,
    ) -> Result<JobSnapshot, PollerError> {
        let mut registry = self.registry.write().await;
        let merged = registry.merge(jobs, target);
        for snapshot in &merged {
            let _ = self.events.send(RegistryEvent::JobUpdated {
                snapshot: snapshot.clone(),
            });
        }
        merged
            .into_iter()
            .find(|s| s.key == key)
            .or_else(|| registry.get(key).cloned())
            .ok_or_else(|| PollerError::UnknownJob {
                key: key.to_string(),
            })
    }

    /// Take the per-job command latch, or refuse the command.
    async fn acquire_latch(&self, key: &str) -> Result<(), PollerError> {
        let mut in_flight = self.commands_in_flight.lock().await;
        if in_flight.insert(key.to_string()) {
            Ok(())
        } else {
            Err(PollerError::CommandInFlight {
                key: key.to_string(),
            })
        }
    }

    async fn release_latch(&self, key: &str) {
        self.commands_in_flight.lock().await.remove(key);
    }
}

/// One target's poll loop. The first tick fires immediately, then at the
/// fixed configured interval. Ends on cancellation (handle dropped) or a
/// terminal not-found/unreachable response.
async fn poll_loop(
    target: Target,
    mut stop_rx: oneshot::Receiver<()>,
    client: MetricsClient,
    config: PollerConfig,
    registry: Arc<RwLock<ServerRegistry>>,
    subscriptions: SubscriptionMap,
    events: broadcast::Sender<RegistryEvent>,
) {
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Ask for the reduced payload only after a full fetch captured the
    // set-once fields.
    let mut totals_known = false;

    loop {
        tokio::select! {
            _ = &mut stop_rx => {
                debug!(peer = %target, "poll loop cancelled");
                return;
            }
            _ = interval.tick() => {
                match client.fetch_status(&target, config.concise && totals_known).await {
                    Ok(payload) => {
                        let jobs = payload.into_jobs();
                        let mut registry = registry.write().await;
                        for snapshot in registry.merge(jobs, &target) {
                            totals_known |= snapshot.doc.total_number_of_tasks.is_some();
                            let _ = events.send(RegistryEvent::JobUpdated { snapshot });
                        }
                    }
                    Err(FetchError::Gone(reason)) => {
                        info!(peer = %target, %reason, "target gone, stopping subscription");
                        subscriptions.lock().await.remove(&target);
                        let _ = events.send(RegistryEvent::TargetGone { target });
                        return;
                    }
                    Err(FetchError::Transient(message)) => {
                        warn!(peer = %target, %message, "transient poll failure, will retry");
                    }
                }
            }
        }
    }
}
