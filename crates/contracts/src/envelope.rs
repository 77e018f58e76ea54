//! ContentEnvelope - the immutable unit being distributed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{ChannelKind, ContractError, EnvelopeId};

/// Immutable content envelope
///
/// Built once per distribution request through [`EnvelopeBuilder`]. There are
/// no mutators; [`ContentEnvelope::with_rendered`] returns a new envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEnvelope {
    id: EnvelopeId,
    title: String,
    body: String,
    link: Option<String>,
    tags: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
    payload_by_channel: BTreeMap<ChannelKind, String>,
    created_at: DateTime<Utc>,
}

impl ContentEnvelope {
    /// Start building an envelope
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    pub fn id(&self) -> &EnvelopeId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Tags in sorted order
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Pre-rendered text for a channel, if the caller supplied one
    pub fn rendered_for(&self, kind: ChannelKind) -> Option<&str> {
        self.payload_by_channel.get(&kind).map(String::as_str)
    }

    /// Return a copy of this envelope carrying pre-rendered text for `kind`
    pub fn with_rendered(&self, kind: ChannelKind, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.payload_by_channel.insert(kind, text.into());
        next
    }
}

/// Builder for [`ContentEnvelope`]
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    id: Option<EnvelopeId>,
    title: String,
    body: String,
    link: Option<String>,
    tags: BTreeSet<String>,
    metadata: BTreeMap<String, String>,
    payload_by_channel: BTreeMap<ChannelKind, String>,
    created_at: Option<DateTime<Utc>>,
}

impl EnvelopeBuilder {
    /// Caller-supplied id (a UUID v4 is generated otherwise)
    pub fn id(mut self, id: impl Into<EnvelopeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Add a tag; blank tags are ignored, surrounding whitespace trimmed
    pub fn tag(mut self, tag: impl AsRef<str>) -> Self {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() {
            self.tags.insert(tag.to_string());
        }
        self
    }

    pub fn tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter().fold(self, |builder, tag| builder.tag(tag))
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Pre-rendered text for one channel
    pub fn rendered(mut self, kind: ChannelKind, text: impl Into<String>) -> Self {
        self.payload_by_channel.insert(kind, text.into());
        self
    }

    /// Override the creation timestamp (defaults to now)
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the envelope
    ///
    /// # Errors
    /// Returns `InvalidEnvelope` if the id is blank or the envelope carries
    /// neither a body, a title, nor any pre-rendered text.
    pub fn build(self) -> Result<ContentEnvelope, ContractError> {
        let id = self.id.unwrap_or_else(EnvelopeId::generate);
        if id.trim().is_empty() {
            return Err(ContractError::invalid_envelope("id cannot be blank"));
        }
        if self.title.trim().is_empty()
            && self.body.trim().is_empty()
            && self.payload_by_channel.is_empty()
        {
            return Err(ContractError::invalid_envelope(
                "envelope has no title, body or pre-rendered payload",
            ));
        }

        Ok(ContentEnvelope {
            id,
            title: self.title,
            body: self.body,
            link: self.link,
            tags: self.tags,
            metadata: self.metadata,
            payload_by_channel: self.payload_by_channel,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_generates_id() {
        let envelope = ContentEnvelope::builder().body("hello").build().unwrap();
        assert!(!envelope.id().is_empty());
    }

    #[test]
    fn test_builder_rejects_empty_content() {
        let result = ContentEnvelope::builder().id("e1").build();
        assert!(matches!(result, Err(ContractError::InvalidEnvelope { .. })));
    }

    #[test]
    fn test_tags_are_trimmed_and_deduplicated() {
        let envelope = ContentEnvelope::builder()
            .body("x")
            .tags(["rust ", "release", "rust", "  "])
            .build()
            .unwrap();
        let tags: Vec<_> = envelope.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["release", "rust"]);
    }

    #[test]
    fn test_with_rendered_leaves_original_untouched() {
        let original = ContentEnvelope::builder().id("e1").body("x").build().unwrap();
        let rerendered = original.with_rendered(ChannelKind::Webhook, "pre");
        assert_eq!(original.rendered_for(ChannelKind::Webhook), None);
        assert_eq!(rerendered.rendered_for(ChannelKind::Webhook), Some("pre"));
        assert_eq!(rerendered.id(), original.id());
    }
}
