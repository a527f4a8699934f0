// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring and lifecycle of the scheduler's background tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use telefetch_bus::EventBus;
use telefetch_config::TelefetchConfig;
use telefetch_core::{AccountId, ChatClient, FileStore, SettingKey, SettingStore, TelefetchError};
use telefetch_registry::SubscriptionRegistry;
use telefetch_speed::{SpeedStats, SpeedTracker};
use telefetch_transfer::TransferPipeline;

use crate::admission::Admission;
use crate::dispatch::Dispatcher;
use crate::download::DownloadStarter;
use crate::listener::LiveListener;
use crate::monitor::DownloadMonitor;
use crate::preload::PreloadScanner;
use crate::recording;
use crate::scanner::HistoryScanner;
use crate::waiting::WaitingQueues;

/// The whole scheduler: registry, queues, loops and transfer pipeline.
///
/// `start` loads persisted state and spawns every loop; `shutdown` stops
/// them, waits for an in-flight transfer and saves the subscriptions.
pub struct AutomationService {
    config: TelefetchConfig,
    client: Arc<dyn ChatClient>,
    settings: Arc<dyn SettingStore>,
    bus: EventBus,
    registry: Arc<SubscriptionRegistry>,
    queues: Arc<WaitingQueues>,
    admission: Arc<Admission>,
    transfers: Arc<TransferPipeline>,
    history: Arc<HistoryScanner>,
    preload: Arc<PreloadScanner>,
    listener: Arc<LiveListener>,
    dispatcher: Arc<Dispatcher>,
    monitor: Arc<DownloadMonitor>,
    cancel: CancellationToken,
    started: AtomicBool,
    observers_attached: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AutomationService {
    pub fn new(
        config: TelefetchConfig,
        client: Arc<dyn ChatClient>,
        files: Arc<dyn FileStore>,
        settings: Arc<dyn SettingStore>,
        bus: EventBus,
    ) -> Self {
        let automation = &config.automation;
        let registry = Arc::new(SubscriptionRegistry::new(bus.clone()));
        let queues = Arc::new(WaitingQueues::new(automation.queue_capacity));
        let admission = Arc::new(Admission::new(automation.download_limit, files.clone()));
        let transfers = Arc::new(TransferPipeline::new(
            files.clone(),
            registry.clone(),
            bus.clone(),
        ));
        let history = Arc::new(HistoryScanner::new(
            registry.clone(),
            client.clone(),
            files.clone(),
            queues.clone(),
            admission.clone(),
            automation.history_scan_budget(),
        ));
        let preload = Arc::new(PreloadScanner::new(
            registry.clone(),
            client.clone(),
            files.clone(),
            automation.history_scan_budget(),
        ));
        let listener = Arc::new(LiveListener::new(
            registry.clone(),
            client.clone(),
            files.clone(),
            queues.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            queues.clone(),
            admission.clone(),
            client.clone(),
            DownloadStarter::new(client.clone(), files.clone(), bus.clone()),
        ));
        let speed = Arc::new(SpeedTracker::new(
            config.speed.window_secs,
            config.speed.smoothing_points,
        ));
        let monitor = Arc::new(DownloadMonitor::new(files, bus.clone(), speed));

        Self {
            config,
            client,
            settings,
            bus,
            registry,
            queues,
            admission,
            transfers,
            history,
            preload,
            listener,
            dispatcher,
            monitor,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            observers_attached: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn queues(&self) -> &Arc<WaitingQueues> {
        &self.queues
    }

    pub fn admission(&self) -> &Arc<Admission> {
        &self.admission
    }

    pub fn transfers(&self) -> &Arc<TransferPipeline> {
        &self.transfers
    }

    pub fn history(&self) -> &Arc<HistoryScanner> {
        &self.history
    }

    pub fn preload(&self) -> &Arc<PreloadScanner> {
        &self.preload
    }

    pub fn listener(&self) -> &Arc<LiveListener> {
        &self.listener
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn monitor(&self) -> &Arc<DownloadMonitor> {
        &self.monitor
    }

    /// Let the waiting queues and the transfer pipeline purge entries of
    /// removed subscriptions. Only the first call registers.
    pub async fn attach_observers(&self) {
        if self.observers_attached.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.register_observer(self.queues.clone()).await;
        self.registry.register_observer(self.transfers.clone()).await;
    }

    /// Download speed statistics for an account that has reported progress.
    pub fn speed_stats(&self, account: AccountId) -> Option<SpeedStats> {
        self.monitor.speed().stats(account)
    }

    /// Load the stored limit and subscriptions, then spawn every loop.
    pub async fn start(&self) -> Result<(), TelefetchError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TelefetchError::Internal("automation already started".into()));
        }

        recording::register_metrics();
        self.attach_observers().await;
        self.admission.load_limit(self.settings.as_ref()).await;
        let loaded = self
            .registry
            .load(self.settings.as_ref(), self.client.as_ref())
            .await?;

        let automation = &self.config.automation;
        let transfer = &self.config.transfer;
        let cancel = &self.cancel;
        let handles = vec![
            tokio::spawn(
                self.history
                    .clone()
                    .run(automation.history_scan_interval(), cancel.clone()),
            ),
            tokio::spawn(
                self.preload
                    .clone()
                    .run(automation.preload_scan_interval(), cancel.clone()),
            ),
            tokio::spawn(
                self.dispatcher
                    .clone()
                    .run(automation.dispatch_interval(), cancel.clone()),
            ),
            tokio::spawn(
                self.listener
                    .clone()
                    .run(self.bus.subscribe(), cancel.clone()),
            ),
            tokio::spawn(
                self.monitor
                    .clone()
                    .run(self.bus.subscribe(), cancel.clone()),
            ),
            tokio::spawn(self.transfers.clone().run_worker(cancel.clone())),
            tokio::spawn(
                self.transfers
                    .clone()
                    .run_completion_listener(self.bus.subscribe(), cancel.clone()),
            ),
            tokio::spawn(
                self.transfers
                    .clone()
                    .run_backfill(transfer.backfill_interval(), cancel.clone()),
            ),
        ];
        self.tasks.lock().await.extend(handles);

        info!(
            subscriptions = loaded,
            download_limit = self.admission.limit(),
            queue_capacity = self.queues.capacity(),
            history_scan_interval_secs = automation.history_scan_interval_secs,
            dispatch_interval_secs = automation.dispatch_interval_secs,
            "automation started"
        );
        Ok(())
    }

    /// Change the per-account download limit and store it.
    pub async fn set_download_limit(&self, limit: u32) -> Result<(), TelefetchError> {
        self.settings
            .put_setting(SettingKey::AutoDownloadLimit, &limit.to_string())
            .await?;
        self.admission.set_limit(limit);
        Ok(())
    }

    /// Stop every loop, wait for an in-flight transfer, save subscriptions.
    pub async fn shutdown(&self) -> Result<(), TelefetchError> {
        self.cancel.cancel();
        let transfer = &self.config.transfer;
        let drained = self
            .transfers
            .shutdown(transfer.shutdown_timeout(), transfer.shutdown_poll())
            .await;

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        if drained {
            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    warn!(error = %e, "automation task ended abnormally");
                }
            }
        } else {
            warn!("leaving transfer worker running past the shutdown timeout");
        }

        self.registry.persist(self.settings.as_ref()).await?;
        info!("automation stopped");
        Ok(())
    }

    /// Run until `signal` fires, then shut down.
    pub async fn run_until(&self, signal: CancellationToken) -> Result<(), TelefetchError> {
        self.start().await?;
        signal.cancelled().await;
        self.shutdown().await
    }
}
