//! Connector Registry & Health Tracker
//!
//! Maps each channel kind to its connector and its last-known health. The
//! set of kinds is fixed once the registry is shared; descriptors are then
//! mutated only through [`ConnectorRegistry::record_outcome`] and
//! [`ConnectorRegistry::check_health`], each under that kind's own lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use contracts::{ChannelKind, Connector, ConnectorDescriptor, DistributionOutcome};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::error::{join_error_message, RegistryError};

/// Default timeout for a single health probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

struct Entry {
    connector: Arc<dyn Connector>,
    descriptor: Mutex<ConnectorDescriptor>,
}

impl Entry {
    fn apply(&self, success: bool, error: Option<String>, at: DateTime<Utc>) -> bool {
        self.descriptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(success, error, at)
    }
}

/// Registry of connectors and their health descriptors
///
/// Build it, register connectors, then share it behind an `Arc`.
pub struct ConnectorRegistry {
    entries: BTreeMap<ChannelKind, Entry>,
    probe_timeout: Duration,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::with_probe_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_probe_timeout(probe_timeout: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            probe_timeout,
        }
    }

    /// Register a connector under its kind
    ///
    /// The descriptor starts inactive and never checked.
    ///
    /// # Errors
    /// `DuplicateChannel` if the kind already has a connector.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> Result<(), RegistryError> {
        let kind = connector.kind();
        if self.entries.contains_key(&kind) {
            return Err(RegistryError::DuplicateChannel(kind));
        }
        let descriptor = ConnectorDescriptor::new(kind, connector.display_name());
        debug!(channel = %kind, connector = connector.display_name(), "Connector registered");
        self.entries.insert(
            kind,
            Entry {
                connector,
                descriptor: Mutex::new(descriptor),
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, kind: ChannelKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn connector(&self, kind: ChannelKind) -> Option<Arc<dyn Connector>> {
        self.entries.get(&kind).map(|e| Arc::clone(&e.connector))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Copy of every descriptor
    pub fn snapshot(&self) -> BTreeMap<ChannelKind, ConnectorDescriptor> {
        self.entries
            .iter()
            .map(|(kind, entry)| {
                let descriptor = entry
                    .descriptor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                (*kind, descriptor)
            })
            .collect()
    }

    /// Record a delivery attempt as the channel's latest health signal
    ///
    /// Returns false when the kind is unknown or the outcome is older than
    /// the last recorded check.
    pub fn record_outcome(&self, kind: ChannelKind, outcome: &DistributionOutcome) -> bool {
        let Some(entry) = self.entries.get(&kind) else {
            warn!(channel = %kind, "Outcome for unregistered channel ignored");
            return false;
        };
        let applied = entry.apply(outcome.success, outcome.detail.clone(), outcome.attempted_at);
        if !applied {
            debug!(channel = %kind, attempted_at = %outcome.attempted_at, "Stale outcome ignored");
        }
        applied
    }

    /// Probe one connector and record the result
    ///
    /// The probe runs as its own task under the probe timeout, so a hanging
    /// or panicking probe only marks this channel inactive.
    ///
    /// # Errors
    /// `UnknownChannel` if the kind has no connector.
    #[instrument(name = "registry_check_health", skip(self), fields(channel = %kind))]
    pub async fn check_health(&self, kind: ChannelKind) -> Result<bool, RegistryError> {
        let entry = self
            .entries
            .get(&kind)
            .ok_or(RegistryError::UnknownChannel(kind))?;

        let connector = Arc::clone(&entry.connector);
        let probe_timeout = self.probe_timeout;
        let checked_at = Utc::now();

        let joined =
            tokio::spawn(async move { tokio::time::timeout(probe_timeout, connector.probe()).await })
                .await;

        let (active, error) = match joined {
            Ok(Ok(result)) => (result.success, result.error_message),
            Ok(Err(_)) => (false, Some("probe timeout".to_string())),
            Err(e) => (false, Some(format!("probe {}", join_error_message(e)))),
        };

        if active {
            debug!("Probe succeeded");
        } else {
            warn!(error = ?error, "Probe failed");
        }
        entry.apply(active, error, checked_at);
        Ok(active)
    }

    /// Probe every registered connector concurrently
    ///
    /// One probe failing, hanging or panicking never prevents the others
    /// from being recorded.
    #[instrument(name = "registry_check_all_health", skip(self), fields(connectors = self.len()))]
    pub async fn check_all_health(&self) -> BTreeMap<ChannelKind, bool> {
        let kinds: Vec<ChannelKind> = self.kinds().collect();
        let results = join_all(kinds.iter().map(|kind| self.check_health(*kind))).await;

        let health: BTreeMap<ChannelKind, bool> = kinds
            .into_iter()
            .zip(results)
            .map(|(kind, result)| (kind, result.unwrap_or(false)))
            .collect();

        info!(
            active = health.values().filter(|ok| **ok).count(),
            total = health.len(),
            "Health check complete"
        );
        health
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}
