//! # Templates
//!
//! Template Variant Selector.
//!
//! Responsible for:
//! - Holding registered template variants (one renderer per channel)
//! - Choosing a variant per channel (explicit key, pre-rendered text, policy)
//! - Rendering a `ContentEnvelope` into a channel's `RenderedPayload`
//!
//! Rendering is pure: identical (envelope, channel, variant) inputs always
//! produce identical payloads.

pub mod error;
pub mod policy;
pub mod registry;
pub mod renderer;
pub mod selector;

pub use error::{RenderError, TemplateError};
pub use policy::VariantPolicy;
pub use registry::{TemplateRegistry, TemplateVariant};
pub use renderer::{interpolate, ChannelRenderer, FnRenderer, FormatRenderer};
pub use selector::Selector;
