//! DistributionOutcome / DistributionReport - Dispatcher output
//!
//! One outcome per requested channel, collected into an ordered report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ChannelKind, ConnectorResult, EnvelopeId};

/// Why a channel attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Rendering the payload failed; the connector was never called
    Render,
    /// Connector reported a failure
    Connector,
    /// Connector call exceeded the per-call timeout
    Timeout,
    /// Distribution was cancelled before this channel started
    Cancelled,
    /// Connector task panicked
    Panicked,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Render => "render",
            FailureReason::Connector => "connector",
            FailureReason::Timeout => "timeout",
            FailureReason::Cancelled => "cancelled",
            FailureReason::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Result of one delivery attempt for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    /// Provider reference on success, error message on failure
    pub detail: Option<String>,
    /// Set on failure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Variant used to render the payload, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub attempted_at: DateTime<Utc>,
    /// Time spent in the connector call, when one was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl DistributionOutcome {
    /// Outcome from a completed connector call
    pub fn from_result(
        channel: ChannelKind,
        result: ConnectorResult,
        variant: Option<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        let detail = result.detail();
        Self {
            channel,
            success: result.success,
            detail,
            failure: (!result.success).then_some(FailureReason::Connector),
            variant,
            attempted_at,
            latency_ms: None,
        }
    }

    /// Failed outcome with an explicit reason
    pub fn failed(
        channel: ChannelKind,
        reason: FailureReason,
        detail: impl Into<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel,
            success: false,
            detail: Some(detail.into()),
            failure: Some(reason),
            variant: None,
            attempted_at,
            latency_ms: None,
        }
    }

    /// Outcome for a channel skipped because the request was cancelled
    pub fn cancelled(channel: ChannelKind, at: DateTime<Utc>) -> Self {
        Self::failed(channel, FailureReason::Cancelled, "cancelled", at)
    }

    /// Outcome for a connector call that exceeded its timeout
    pub fn timed_out(channel: ChannelKind, variant: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            variant,
            ..Self::failed(channel, FailureReason::Timeout, "timeout", at)
        }
    }

    /// Attach the measured connector latency
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Whether the attempt reached the connector (and so says something about health)
    pub fn reached_connector(&self) -> bool {
        !matches!(
            self.failure,
            Some(FailureReason::Render) | Some(FailureReason::Cancelled)
        )
    }
}

/// Ordered, frozen result of one `distribute` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    request_id: EnvelopeId,
    outcomes: Vec<DistributionOutcome>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl DistributionReport {
    pub fn request_id(&self) -> &EnvelopeId {
        &self.request_id
    }

    /// Outcomes in the order the channels were requested
    pub fn outcomes(&self) -> &[DistributionOutcome] {
        &self.outcomes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome(&self, channel: ChannelKind) -> Option<&DistributionOutcome> {
        self.outcomes.iter().find(|o| o.channel == channel)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_complete_success(&self) -> bool {
        !self.outcomes.is_empty() && self.failed() == 0
    }

    /// Channels that did not succeed, in request order
    ///
    /// Suitable as the narrowed channel list for a retry.
    pub fn failed_channels(&self) -> Vec<ChannelKind> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.channel)
            .collect()
    }

    /// Wall-clock duration of the distribution
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }
}

/// Append-only builder; [`ReportBuilder::finish`] freezes the report
#[derive(Debug)]
pub struct ReportBuilder {
    request_id: EnvelopeId,
    outcomes: Vec<DistributionOutcome>,
    started_at: DateTime<Utc>,
}

impl ReportBuilder {
    pub fn new(request_id: EnvelopeId, expected: usize) -> Self {
        Self {
            request_id,
            outcomes: Vec::with_capacity(expected),
            started_at: Utc::now(),
        }
    }

    pub fn push(&mut self, outcome: DistributionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(self) -> DistributionReport {
        DistributionReport {
            request_id: self.request_id,
            outcomes: self.outcomes,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}
