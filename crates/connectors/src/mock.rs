//! Mock connector implementation
//!
//! Implements `Connector` with scripted behavior and call accounting.
//! Used by tests of the dispatcher and health tracker without any network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ChannelKind, Connector, ConnectorResult, RenderedPayload};
use tracing::trace;

/// Scripted reaction to a `send` or `probe` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Succeed with an optional reference
    Succeed(Option<String>),
    /// Report a remote failure
    Fail(String),
    /// Panic inside the call
    Panic,
    /// Never complete
    Hang,
}

/// Mock connector
pub struct MockConnector {
    kind: ChannelKind,
    name: String,
    send_behavior: MockBehavior,
    probe_behavior: MockBehavior,
    delay: Duration,
    probe_delay: Duration,
    sends: AtomicUsize,
    probes: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    payloads: Mutex<Vec<RenderedPayload>>,
}

impl MockConnector {
    /// Mock that succeeds on every call
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            name: format!("mock-{kind}"),
            send_behavior: MockBehavior::Succeed(Some(format!("{kind}-ref"))),
            probe_behavior: MockBehavior::Succeed(None),
            delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            sends: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// `send` succeeds with `reference`
    pub fn succeed(mut self, reference: impl Into<String>) -> Self {
        self.send_behavior = MockBehavior::Succeed(Some(reference.into()));
        self
    }

    /// `send` fails with `message`
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.send_behavior = MockBehavior::Fail(message.into());
        self
    }

    /// `send` panics
    pub fn panics(mut self) -> Self {
        self.send_behavior = MockBehavior::Panic;
        self
    }

    /// `send` never completes
    pub fn hangs(mut self) -> Self {
        self.send_behavior = MockBehavior::Hang;
        self
    }

    /// Sleep before each `send` reacts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_probe(mut self, behavior: MockBehavior) -> Self {
        self.probe_behavior = behavior;
        self
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    /// Number of `send` calls started
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Number of `probe` calls started
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `send` calls observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Payloads received, in call order
    pub fn payloads(&self) -> Vec<RenderedPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn react(&self, behavior: &MockBehavior, delay: Duration) -> ConnectorResult {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match behavior {
            MockBehavior::Succeed(reference) => ConnectorResult::delivered(reference.clone()),
            MockBehavior::Fail(message) => ConnectorResult::failed(message.clone()),
            MockBehavior::Panic => panic!("mock connector '{}' panicked", self.name),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Decrements the in-flight gauge even when the send is dropped or panics
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        trace!(connector = %self.name, "Mock send");

        self.react(&self.send_behavior, self.delay).await
    }

    async fn probe(&self) -> ConnectorResult {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.react(&self.probe_behavior, self.probe_delay).await
    }
}
