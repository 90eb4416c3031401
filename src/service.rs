// File: ./src/service.rs
//! Single entry point for callers.
//!
//! Reads prefer the remote dataset and fail over to local storage. Writes are
//! applied to a copy of the caller's collections, persisted to local storage
//! before returning, and pushed to the remote endpoint in the background.
//! The service holds no state between calls.
use crate::client::RemoteGateway;
use crate::model::{Dataset, Event, HelpService, ItemKind, Record, remove_by_id, upsert};
use crate::storage::LocalStore;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    /// The operation needs a remote endpoint and none is configured.
    EndpointNotConfigured,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::EndpointNotConfigured => {
                write!(f, "remote endpoint is not configured")
            }
        }
    }
}

impl std::error::Error for ServiceError {}

/// Which write triggered a background push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOrigin {
    Save(ItemKind),
    Delete(ItemKind),
}

/// Outcome of one background push, delivered on the diagnostics channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub operation: PushOrigin,
    pub ok: bool,
}

#[derive(Clone, Debug)]
pub struct DataService {
    gateway: RemoteGateway,
    store: LocalStore,
    diagnostics: Option<mpsc::UnboundedSender<PushReport>>,
}

impl DataService {
    pub fn new(gateway: RemoteGateway, store: LocalStore) -> Self {
        Self {
            gateway,
            store,
            diagnostics: None,
        }
    }

    /// Like [`DataService::new`], also returning a receiver that gets one
    /// [`PushReport`] per background push once it has finished.
    pub fn with_diagnostics(
        gateway: RemoteGateway,
        store: LocalStore,
    ) -> (Self, mpsc::UnboundedReceiver<PushReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            gateway,
            store,
            diagnostics: Some(tx),
        };
        (service, rx)
    }

    /// Remote data when reachable (even if empty), local fallback otherwise.
    pub async fn load(&self) -> Dataset {
        if let Some(cloud) = self.gateway.fetch_remote().await {
            return cloud;
        }
        log::warn!("Using local storage (remote fetch failed or is not configured)");
        self.store.load_fallback()
    }

    /// Overwrites the remote dataset with `data`.
    pub async fn override_remote(&self, data: &Dataset) -> Result<bool, ServiceError> {
        if !self.gateway.is_configured() {
            log::error!("Refusing to override remote data: no endpoint configured");
            return Err(ServiceError::EndpointNotConfigured);
        }
        Ok(self.gateway.push_remote(data).await)
    }

    /// Upserts `event` and returns the new event collection. The returned value
    /// does not depend on the outcome of the remote push.
    pub async fn save_event(
        &self,
        event: Event,
        current_events: &[Event],
        current_help: &[HelpService],
    ) -> Vec<Event> {
        let new_events = upsert(current_events, event);
        let full = Dataset::new(new_events.clone(), current_help.to_vec());
        self.persist(full, PushOrigin::Save(Event::KIND));
        new_events
    }

    pub async fn save_help(
        &self,
        service: HelpService,
        current_events: &[Event],
        current_help: &[HelpService],
    ) -> Vec<HelpService> {
        let new_help = upsert(current_help, service);
        let full = Dataset::new(current_events.to_vec(), new_help.clone());
        self.persist(full, PushOrigin::Save(HelpService::KIND));
        new_help
    }

    /// Removes `id` from the collection selected by `kind`; the other
    /// collection is returned unchanged.
    pub async fn delete_item(
        &self,
        id: &str,
        kind: ItemKind,
        current_events: &[Event],
        current_help: &[HelpService],
    ) -> Dataset {
        let full = match kind {
            ItemKind::Event => Dataset::new(remove_by_id(current_events, id), current_help.to_vec()),
            ItemKind::Help => Dataset::new(current_events.to_vec(), remove_by_id(current_help, id)),
        };
        self.persist(full.clone(), PushOrigin::Delete(kind));
        full
    }

    /// Local write completes before returning; the remote push runs detached.
    fn persist(&self, data: Dataset, operation: PushOrigin) -> Option<JoinHandle<()>> {
        self.store.save_fallback(&data);
        if !self.gateway.is_configured() {
            return None;
        }

        let gateway = self.gateway.clone();
        let diagnostics = self.diagnostics.clone();
        Some(tokio::spawn(async move {
            let ok = gateway.push_remote(&data).await;
            if !ok {
                log::warn!("Background push after {:?} failed; local copy kept", operation);
            }
            if let Some(tx) = diagnostics {
                // Receiver may be gone; nothing to do then.
                let _ = tx.send(PushReport { operation, ok });
            }
        }))
    }
}
