//! Scheduler module: one independent repeating timer per resource.
//!
//! Each resource gets its own task running the tick pipeline
//! (probe → classify → persist → alert/mirror). The pipeline runs inline in
//! the timer loop, so ticks for one resource are strictly sequential; ticks
//! for different resources run concurrently. Stopping a resource prevents
//! future fires but lets an in-flight tick complete and persist.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::alert::AlertDispatcher;
use crate::classify;
use crate::mirror::MirrorPublisher;
use crate::probe;
use crate::store::{MonitoredResource, ResourceStatus, Store, StoreError};

/// Pause between stop-all and start-all during a restart, so a bulk reload
/// does not re-enter with a thundering herd.
const RESTART_SETTLE: Duration = Duration::from_secs(1);

/// Engine status summary for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub active_monitor_count: usize,
    pub total_enabled_resource_count: usize,
    pub monitored_ids: Vec<String>,
}

/// The monitoring engine: owns the per-resource timer handles.
pub struct Scheduler {
    store: Arc<Store>,
    dispatcher: Arc<AlertDispatcher>,
    mirror: Arc<MirrorPublisher>,
    client: reqwest::Client,
    stop_chans: Arc<RwLock<HashMap<String, broadcast::Sender<()>>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<Store>,
        dispatcher: Arc<AlertDispatcher>,
        mirror: Arc<MirrorPublisher>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            dispatcher,
            mirror,
            client,
            stop_chans: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start monitoring every non-stopped resource in the store.
    pub async fn start_all(&self) {
        let resources = self.store.get_resources();
        tracing::info!("Scheduler: starting with {} resources", resources.len());
        for resource in resources {
            self.start_resource(resource).await;
        }
    }

    /// Stop every per-resource timer. Entries leave the map immediately so
    /// a following start-all can re-arm without waiting for task teardown.
    pub async fn stop_all(&self) {
        let mut chans = self.stop_chans.write().await;
        tracing::info!("Scheduler: stopping {} monitors", chans.len());
        for (_, stop_tx) in chans.drain() {
            let _ = stop_tx.send(());
        }
    }

    /// Stop-all then start-all with a settling delay; used after bulk
    /// configuration reload.
    pub async fn restart(&self) {
        self.stop_all().await;
        tokio::time::sleep(RESTART_SETTLE).await;
        self.start_all().await;
    }

    /// Begin monitoring one resource. No-op if it is already scheduled or
    /// paused by the operator.
    pub async fn start_resource(&self, resource: MonitoredResource) {
        if resource.stopped {
            return;
        }

        let mut stop_chans = self.stop_chans.write().await;
        if stop_chans.contains_key(&resource.id) {
            return; // Already running
        }

        let (stop_tx, stop_rx) = broadcast::channel(1);
        stop_chans.insert(resource.id.clone(), stop_tx);
        drop(stop_chans);

        tracing::info!(
            "Scheduler: monitoring {} ({}) every {}s",
            resource.name,
            resource.id,
            resource.interval_seconds
        );

        let ctx = TickContext {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            mirror: self.mirror.clone(),
            client: self.client.clone(),
        };
        let stop_chans = self.stop_chans.clone();
        let id = resource.id.clone();
        let interval_seconds = resource.interval_seconds.max(1);

        tokio::spawn(async move {
            run_monitor_loop(ctx, &id, interval_seconds, stop_rx).await;

            // Clean up when done. The entry may already have been replaced
            // by a restart; a live receiver marks it as not ours.
            let mut chans = stop_chans.write().await;
            if chans.get(&id).is_some_and(|tx| tx.receiver_count() == 0) {
                chans.remove(&id);
            }
        });
    }

    /// Cancel the timer for one resource, if armed. Safe to call while a
    /// check is in flight: that check completes and persists, then the
    /// monitor task unwinds.
    pub async fn stop_resource(&self, id: &str) -> bool {
        let mut chans = self.stop_chans.write().await;
        match chans.remove(id) {
            Some(stop_tx) => {
                let _ = stop_tx.send(());
                tracing::info!("Scheduler: stopped monitor {}", id);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the engine state.
    pub async fn status(&self) -> EngineStatus {
        let chans = self.stop_chans.read().await;
        let mut monitored_ids: Vec<String> = chans.keys().cloned().collect();
        monitored_ids.sort();

        let total_enabled_resource_count = self
            .store
            .get_resources()
            .iter()
            .filter(|r| !r.stopped)
            .count();

        EngineStatus {
            active_monitor_count: monitored_ids.len(),
            total_enabled_resource_count,
            monitored_ids,
        }
    }
}

/// Everything one tick needs, cloneable into the monitor task.
#[derive(Clone)]
struct TickContext {
    store: Arc<Store>,
    dispatcher: Arc<AlertDispatcher>,
    mirror: Arc<MirrorPublisher>,
    client: reqwest::Client,
}

/// Timer loop for a single resource: one immediate check, then a repeating
/// interval. The tick body is awaited inside the loop, never spawned, so a
/// slow check simply delays the next fire instead of overlapping it.
async fn run_monitor_loop(
    ctx: TickContext,
    id: &str,
    interval_seconds: u64,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                break;
            }
            _ = interval.tick() => {
                run_tick(&ctx, id).await;
            }
        }
    }
}

/// One execution of the check → classify → persist → alert pipeline.
///
/// Errors here never propagate: a persistence failure abandons the tick
/// (the next one retries naturally) and notification failures are handled
/// inside the dispatcher.
async fn run_tick(ctx: &TickContext, id: &str) {
    // Snapshot for config only; all state transitions are computed inside
    // the atomic update below.
    let resource = match ctx.store.get_resource(id) {
        Ok(r) => r,
        Err(_) => return, // deleted since the last fire
    };

    let outcome = probe::run_check(&ctx.client, resource.kind, &resource.url).await;
    let checked_at = Utc::now();

    let update = ctx.store.atomic_update(id, |r| {
        let (status, failures) = classify::classify(r.kind, &outcome, r.consecutive_failures);
        r.status = status;
        r.consecutive_failures = failures;
        r.last_check_at = Some(checked_at);
        r.last_response_time_ms = outcome.response_time_ms;
        r.total_checks += 1;
        if classify::outcome_success(r.kind, &outcome) {
            r.successful_checks += 1;
        }
        r.refresh_uptime();
        if status == ResourceStatus::Up {
            // recovery reopens the alert latch
            r.alert_sent = false;
        }
        r.push_history(status);
    });

    let update = match update {
        Ok(u) => u,
        Err(StoreError::NotFound) => return,
        Err(e) => {
            tracing::error!("Scheduler: failed to persist check for {}: {}", id, e);
            return;
        }
    };

    if update.previous.status != update.current.status {
        tracing::info!(
            "Scheduler: {} transitioned {:?} -> {:?}",
            update.current.name,
            update.previous.status,
            update.current.status
        );

        let latch_closed = ctx
            .dispatcher
            .dispatch(&update.current, update.previous.status)
            .await;
        if latch_closed {
            if let Err(e) = ctx.store.atomic_update(id, |r| r.alert_sent = true) {
                tracing::warn!("Scheduler: failed to record alert latch for {}: {}", id, e);
            }
        }

        ctx.mirror.trigger();
    }
}
