//! # Dispatcher
//!
//! Distribution fan-out.
//!
//! Responsible for:
//! - Holding the connector registry and per-channel health
//! - Rendering and sending one envelope to many channels concurrently
//! - Isolating slow, failing or panicking channels from each other
//! - Returning an ordered, per-channel report

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;

pub use contracts::{Connector, DistributionReport};
pub use dispatcher::{
    create_dispatcher, DispatchOptions, DispatchSettings, Dispatcher, DispatcherBuilder,
    DispatcherStatus, DEFAULT_SEND_TIMEOUT,
};
pub use error::{DispatchError, DispatcherError, RegistryError};
pub use metrics::{ChannelMetrics, MetricsSnapshot};
pub use registry::{ConnectorRegistry, DEFAULT_PROBE_TIMEOUT};
pub use tokio_util::sync::CancellationToken;
