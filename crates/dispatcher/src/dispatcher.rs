//! Dispatcher - concurrent fan-out of one envelope to many channels

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use contracts::{
    ChannelKind, Connector, ConnectorDescriptor, ContentEnvelope, DispatchConfig,
    DistributionBlueprint, DistributionOutcome, DistributionReport, FailureReason, ReportBuilder,
};
use templates::Selector;

use crate::error::{join_error_message, DispatchError, DispatcherError};
use crate::metrics::{ChannelMetrics, MetricsSnapshot};
use crate::registry::{ConnectorRegistry, DEFAULT_PROBE_TIMEOUT};

/// Default per-send timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatcher-wide defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Per-send timeout
    pub timeout: Duration,
    /// Health probe timeout
    pub probe_timeout: Duration,
    /// Concurrent connector calls (None = unbounded)
    pub max_in_flight: Option<usize>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SEND_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_in_flight: None,
        }
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Per-request options for [`Dispatcher::distribute`]
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Render every channel with this variant
    pub variant_key: Option<String>,
    /// Override the per-send timeout
    pub timeout: Option<Duration>,
    /// Override the concurrency bound
    pub max_in_flight: Option<usize>,
    /// Channels not yet started when this fires are reported as cancelled
    pub cancel: CancellationToken,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, key: impl Into<String>) -> Self {
        self.variant_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Health overview returned by [`Dispatcher::status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStatus {
    pub connectors: BTreeMap<ChannelKind, ConnectorDescriptor>,
    /// True when at least one connector is active
    pub healthy: bool,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    settings: DispatchSettings,
    selector: Selector,
    connectors: Vec<Arc<dyn Connector>>,
}

impl DispatcherBuilder {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            settings,
            selector: Selector::default(),
            connectors: Vec::new(),
        }
    }

    pub fn selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    /// Register connectors and build the dispatcher
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(connector_count = self.connectors.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut registry = ConnectorRegistry::with_probe_timeout(self.settings.probe_timeout);
        for connector in self.connectors {
            registry.register(connector)?;
        }
        Ok(Dispatcher::new(
            Arc::new(registry),
            Arc::new(self.selector),
            self.settings,
        ))
    }
}

/// Create a dispatcher from a loaded blueprint
///
/// Builds every enabled connector, the template registry and the selection
/// policy.
#[instrument(
    name = "dispatcher_create",
    skip(blueprint),
    fields(connectors = blueprint.connectors.len())
)]
pub fn create_dispatcher(blueprint: &DistributionBlueprint) -> Result<Dispatcher, DispatcherError> {
    let mut builder = DispatcherBuilder::new(DispatchSettings::from(&blueprint.dispatch))
        .selector(Selector::from_config(&blueprint.templates)?);

    for config in blueprint.enabled_connectors() {
        let connector = connectors::create_connector(config)
            .map_err(|e| DispatcherError::connector_creation(config.kind, e.to_string()))?;
        builder = builder.connector(connector);
    }
    builder.build()
}

/// The main Dispatcher that fans out envelopes to connectors
pub struct Dispatcher {
    registry: Arc<ConnectorRegistry>,
    selector: Arc<Selector>,
    settings: DispatchSettings,
    metrics: Arc<BTreeMap<ChannelKind, ChannelMetrics>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        selector: Arc<Selector>,
        settings: DispatchSettings,
    ) -> Self {
        let metrics = registry
            .kinds()
            .map(|kind| (kind, ChannelMetrics::new()))
            .collect();
        Self {
            registry,
            selector,
            settings,
            metrics: Arc::new(metrics),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Get metrics for all channels
    pub fn metrics(&self) -> Vec<(ChannelKind, MetricsSnapshot)> {
        self.metrics
            .iter()
            .map(|(kind, m)| (*kind, m.snapshot()))
            .collect()
    }

    /// Current health of every registered connector
    pub fn status(&self) -> DispatcherStatus {
        let connectors = self.registry.snapshot();
        let healthy = connectors.values().any(|d| d.active);
        DispatcherStatus {
            connectors,
            healthy,
        }
    }

    /// Probe every connector, then report status
    pub async fn refresh_status(&self) -> DispatcherStatus {
        self.registry.check_all_health().await;
        self.status()
    }

    /// Distribute one envelope to `channels`
    ///
    /// Every channel runs as its own task: render, send under the per-call
    /// timeout, record health. The report lists exactly one outcome per
    /// requested channel, in request order.
    ///
    /// # Errors
    /// Only precondition failures; no connector is called when one occurs.
    #[instrument(
        name = "dispatcher_distribute",
        skip(self, envelope, channels, options),
        fields(request_id = %envelope.id(), channels = channels.len())
    )]
    pub async fn distribute(
        &self,
        envelope: &ContentEnvelope,
        channels: &[ChannelKind],
        options: DispatchOptions,
    ) -> Result<DistributionReport, DispatchError> {
        let targets = self.resolve_targets(channels)?;

        let timeout = options.timeout.unwrap_or(self.settings.timeout);
        let limit = options
            .max_in_flight
            .or(self.settings.max_in_flight)
            .map(|n| n.max(1));
        let gate = limit.map(|n| Arc::new(Semaphore::new(n)));
        let envelope = Arc::new(envelope.clone());
        let variant_key: Option<Arc<str>> = options.variant_key.as_deref().map(Arc::from);

        debug!(?timeout, ?limit, variant = ?variant_key, "Fan-out starting");

        let mut builder = ReportBuilder::new(envelope.id().clone(), targets.len());

        let handles: Vec<_> = targets
            .into_iter()
            .map(|(kind, connector)| {
                let task = ChannelTask {
                    kind,
                    connector,
                    registry: Arc::clone(&self.registry),
                    selector: Arc::clone(&self.selector),
                    metrics: Arc::clone(&self.metrics),
                    envelope: Arc::clone(&envelope),
                    variant_key: variant_key.clone(),
                    timeout,
                    gate: gate.clone(),
                    cancel: options.cancel.clone(),
                };
                tokio::spawn(task.run())
            })
            .collect();

        let spawned_at = Utc::now();
        for (kind, joined) in channels.iter().copied().zip(join_all(handles).await) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = join_error_message(e);
                    warn!(channel = %kind, error = %message, "Channel task failed");
                    let outcome =
                        DistributionOutcome::failed(kind, FailureReason::Panicked, message, spawned_at);
                    self.registry.record_outcome(kind, &outcome);
                    if let Some(metrics) = self.metrics.get(&kind) {
                        metrics.record(&outcome);
                    }
                    outcome
                }
            };
            builder.push(outcome);
        }

        let report = builder.finish();
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration().num_milliseconds(),
            "Distribution complete"
        );
        Ok(report)
    }

    /// Check preconditions and pair each channel with its connector
    fn resolve_targets(
        &self,
        channels: &[ChannelKind],
    ) -> Result<Vec<(ChannelKind, Arc<dyn Connector>)>, DispatchError> {
        if channels.is_empty() {
            return Err(DispatchError::EmptyChannelList);
        }

        let mut targets = Vec::with_capacity(channels.len());
        for &kind in channels {
            let connector = self
                .registry
                .connector(kind)
                .ok_or(DispatchError::UnknownChannel(kind))?;
            targets.push((kind, connector));
        }

        let mut seen = BTreeSet::new();
        if let Some(kind) = channels.iter().find(|kind| !seen.insert(**kind)) {
            return Err(DispatchError::DuplicateChannel(*kind));
        }

        Ok(targets)
    }
}

/// Everything one channel attempt needs, owned so it can run as a task
struct ChannelTask {
    kind: ChannelKind,
    connector: Arc<dyn Connector>,
    registry: Arc<ConnectorRegistry>,
    selector: Arc<Selector>,
    metrics: Arc<BTreeMap<ChannelKind, ChannelMetrics>>,
    envelope: Arc<ContentEnvelope>,
    variant_key: Option<Arc<str>>,
    timeout: Duration,
    gate: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
}

impl ChannelTask {
    async fn run(self) -> DistributionOutcome {
        let outcome = self.attempt().await;
        if let Some(metrics) = self.metrics.get(&self.kind) {
            metrics.record(&outcome);
        }
        if outcome.reached_connector() {
            self.registry.record_outcome(self.kind, &outcome);
        }
        outcome
    }

    #[instrument(name = "dispatcher_channel", skip(self), fields(channel = %self.kind))]
    async fn attempt(&self) -> DistributionOutcome {
        let Some(_permit) = self.admit().await else {
            debug!("Cancelled before start");
            return DistributionOutcome::cancelled(self.kind, Utc::now());
        };

        let attempted_at = Utc::now();
        let payload = match self
            .selector
            .render(&self.envelope, self.kind, self.variant_key.as_deref())
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Render failed");
                return DistributionOutcome::failed(
                    self.kind,
                    FailureReason::Render,
                    e.to_string(),
                    attempted_at,
                );
            }
        };

        if let Some(metrics) = self.metrics.get(&self.kind) {
            metrics.inc_attempts();
        }
        let variant = payload.variant.clone();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.connector.send(&payload)).await {
            Ok(result) => DistributionOutcome::from_result(self.kind, result, variant, attempted_at),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Send timed out");
                DistributionOutcome::timed_out(self.kind, variant, attempted_at)
            }
        };
        outcome.with_latency(started.elapsed())
    }

    /// Wait for a concurrency slot; None when cancelled first
    ///
    /// Returns `Some(None)` when the dispatch is unbounded.
    async fn admit(&self) -> Option<Option<OwnedSemaphorePermit>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let permit = match &self.gate {
            Some(gate) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                permit = Arc::clone(gate).acquire_owned() => Some(permit.ok()?),
            },
            None => None,
        };
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(permit)
    }
}
