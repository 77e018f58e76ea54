//! Template error types

use contracts::ChannelKind;
use thiserror::Error;

/// Errors raised while rendering one channel's payload
///
/// Scoped to a single channel: the dispatcher turns these into a failed
/// outcome for that channel only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Requested variant key is not registered
    #[error("unknown template variant '{0}'")]
    UnknownVariant(String),

    /// Selected variant has no renderer for the channel
    #[error("variant '{variant}' has no template for channel '{channel}'")]
    MissingChannelMapping {
        variant: String,
        channel: ChannelKind,
    },

    /// Selection policy produced no variant for the channel
    #[error("no template variant selected for channel '{0}'")]
    NoVariantSelected(ChannelKind),
}

/// Errors raised while building the template registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A variant with this key is already registered
    #[error("template variant '{0}' already registered")]
    DuplicateVariant(String),
}
