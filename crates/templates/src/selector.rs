//! Template Variant Selector
//!
//! Resolution order for one (envelope, channel) pair:
//! 1. an explicit variant key
//! 2. text pre-rendered on the envelope for that channel
//! 3. the configured [`VariantPolicy`]

use tracing::{debug, instrument};

use contracts::{ChannelKind, ContentEnvelope, RenderedPayload, TemplatesConfig};

use crate::error::{RenderError, TemplateError};
use crate::policy::VariantPolicy;
use crate::registry::TemplateRegistry;

/// Resolves a variant and renders the payload for one channel
///
/// Side-effect free: a pure function of its inputs and the read-only registry.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    registry: TemplateRegistry,
    policy: VariantPolicy,
}

impl Selector {
    pub fn new(registry: TemplateRegistry, policy: VariantPolicy) -> Self {
        Self { registry, policy }
    }

    /// Build registry and policy from configuration
    pub fn from_config(config: &TemplatesConfig) -> Result<Self, TemplateError> {
        Ok(Self {
            registry: TemplateRegistry::from_config(config)?,
            policy: VariantPolicy::from(&config.policy),
        })
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &VariantPolicy {
        &self.policy
    }

    /// Render `envelope` for `kind`
    ///
    /// # Errors
    /// - `UnknownVariant` if `variant_key` (or the policy's pick) is not registered
    /// - `MissingChannelMapping` if the chosen variant cannot render `kind`
    /// - `NoVariantSelected` if the policy yields nothing
    #[instrument(
        name = "selector_render",
        level = "debug",
        skip(self, envelope),
        fields(envelope_id = %envelope.id())
    )]
    pub fn render(
        &self,
        envelope: &ContentEnvelope,
        kind: ChannelKind,
        variant_key: Option<&str>,
    ) -> Result<RenderedPayload, RenderError> {
        if let Some(key) = variant_key {
            return self.render_variant(key, envelope, kind);
        }

        if let Some(text) = envelope.rendered_for(kind) {
            debug!(channel = %kind, "Using pre-rendered payload");
            let mut payload = RenderedPayload::text(kind, text);
            payload.tags = envelope.tags().iter().cloned().collect();
            return Ok(payload);
        }

        let key = self
            .policy
            .select(envelope, kind)
            .ok_or(RenderError::NoVariantSelected(kind))?;
        self.render_variant(key, envelope, kind)
    }

    fn render_variant(
        &self,
        key: &str,
        envelope: &ContentEnvelope,
        kind: ChannelKind,
    ) -> Result<RenderedPayload, RenderError> {
        let variant = self
            .registry
            .get(key)
            .ok_or_else(|| RenderError::UnknownVariant(key.to_string()))?;
        debug!(channel = %kind, variant = key, "Rendering variant");
        variant.render_for(kind, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::FormatRenderer;
    use crate::registry::TemplateVariant;

    fn selector() -> Selector {
        let mut registry = TemplateRegistry::new();
        registry
            .register(
                TemplateVariant::new("default")
                    .with_renderer(ChannelKind::ChatBroadcast, FormatRenderer::new("{title}\n{body}"))
                    .with_renderer(ChannelKind::IssueTracker, FormatRenderer::new("{body}").with_title("{title}")),
            )
            .unwrap();
        registry
            .register(
                TemplateVariant::new("short")
                    .with_renderer(ChannelKind::ChatBroadcast, FormatRenderer::new("{title}")),
            )
            .unwrap();
        Selector::new(registry, VariantPolicy::Fixed("default".into()))
    }

    fn envelope() -> ContentEnvelope {
        ContentEnvelope::builder()
            .id("e1")
            .title("Launch")
            .body("We shipped")
            .build()
            .unwrap()
    }

    #[test]
    fn test_policy_default() {
        let payload = selector()
            .render(&envelope(), ChannelKind::ChatBroadcast, None)
            .unwrap();
        assert_eq!(payload.text, "Launch\nWe shipped");
        assert_eq!(payload.variant.as_deref(), Some("default"));
    }

    #[test]
    fn test_explicit_variant_wins() {
        let payload = selector()
            .render(&envelope(), ChannelKind::ChatBroadcast, Some("short"))
            .unwrap();
        assert_eq!(payload.text, "Launch");
        assert_eq!(payload.variant.as_deref(), Some("short"));
    }

    #[test]
    fn test_explicit_variant_beats_pre_rendered() {
        let env = envelope().with_rendered(ChannelKind::ChatBroadcast, "pre");
        let s = selector();
        assert_eq!(s.render(&env, ChannelKind::ChatBroadcast, None).unwrap().text, "pre");
        assert_eq!(
            s.render(&env, ChannelKind::ChatBroadcast, Some("short")).unwrap().text,
            "Launch"
        );
    }

    #[test]
    fn test_unknown_variant() {
        let err = selector()
            .render(&envelope(), ChannelKind::ChatBroadcast, Some("nope"))
            .unwrap_err();
        assert_eq!(err, RenderError::UnknownVariant("nope".into()));
    }

    #[test]
    fn test_missing_channel_mapping() {
        let err = selector()
            .render(&envelope(), ChannelKind::IssueTracker, Some("short"))
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingChannelMapping { .. }));
    }

    #[test]
    fn test_render_is_deterministic() {
        let s = selector();
        let env = envelope();
        let a = s.render(&env, ChannelKind::IssueTracker, Some("default")).unwrap();
        let b = s.render(&env, ChannelKind::IssueTracker, Some("default")).unwrap();
        assert_eq!(a, b);
    }
}
