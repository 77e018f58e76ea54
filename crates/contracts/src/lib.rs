//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace: the
//! distribution data model, the [`Connector`] trait and the configuration
//! blueprint. Business crates depend on this crate only, never on each other
//! in reverse.
//!
//! ## Time Model
//! - All timestamps are `chrono::DateTime<Utc>`
//! - An outcome's `attempted_at` is taken when the channel attempt starts

mod blueprint;
mod channel;
mod connector;
mod descriptor;
mod envelope;
mod envelope_id;
mod error;
mod outcome;
mod payload;

pub use blueprint::*;
pub use channel::ChannelKind;
pub use connector::Connector;
pub use descriptor::ConnectorDescriptor;
pub use envelope::{ContentEnvelope, EnvelopeBuilder};
pub use envelope_id::EnvelopeId;
pub use error::*;
pub use outcome::*;
pub use payload::{ConnectorResult, RenderedPayload};

pub use async_trait::async_trait;
