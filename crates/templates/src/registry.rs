//! Template registry
//!
//! Read-only once built: variants are registered at startup and looked up by
//! key while rendering.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{ChannelKind, ContentEnvelope, RenderedPayload, TemplatesConfig};

use crate::error::{RenderError, TemplateError};
use crate::renderer::{ChannelRenderer, FormatRenderer};

/// A named template variant with one renderer per channel
#[derive(Clone)]
pub struct TemplateVariant {
    key: String,
    renderers: BTreeMap<ChannelKind, Arc<dyn ChannelRenderer>>,
}

impl TemplateVariant {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            renderers: BTreeMap::new(),
        }
    }

    /// Attach a renderer for one channel (replaces an existing one)
    pub fn with_renderer<R>(mut self, kind: ChannelKind, renderer: R) -> Self
    where
        R: ChannelRenderer + 'static,
    {
        self.renderers.insert(kind, Arc::new(renderer));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Channels this variant can render
    pub fn channels(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.renderers.keys().copied()
    }

    /// Render the envelope for `kind`
    ///
    /// # Errors
    /// `MissingChannelMapping` if this variant has no renderer for `kind`.
    pub fn render_for(
        &self,
        kind: ChannelKind,
        envelope: &ContentEnvelope,
    ) -> Result<RenderedPayload, RenderError> {
        let renderer = self
            .renderers
            .get(&kind)
            .ok_or_else(|| RenderError::MissingChannelMapping {
                variant: self.key.clone(),
                channel: kind,
            })?;

        let mut payload = renderer.render(envelope, kind);
        payload.channel = kind;
        payload.variant = Some(self.key.clone());
        Ok(payload)
    }
}

impl std::fmt::Debug for TemplateVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateVariant")
            .field("key", &self.key)
            .field("channels", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of template variants keyed by variant key
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    variants: BTreeMap<String, TemplateVariant>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration, one `FormatRenderer` per channel template
    pub fn from_config(config: &TemplatesConfig) -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        for variant_config in &config.variants {
            let variant = variant_config.channels.iter().fold(
                TemplateVariant::new(&variant_config.key),
                |variant, (kind, template)| {
                    variant.with_renderer(*kind, FormatRenderer::from_config(template))
                },
            );
            registry.register(variant)?;
        }
        Ok(registry)
    }

    /// Register a variant
    ///
    /// # Errors
    /// `DuplicateVariant` if the key is taken.
    pub fn register(&mut self, variant: TemplateVariant) -> Result<(), TemplateError> {
        if self.variants.contains_key(variant.key()) {
            return Err(TemplateError::DuplicateVariant(variant.key().to_string()));
        }
        self.variants.insert(variant.key().to_string(), variant);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&TemplateVariant> {
        self.variants.get(key)
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
