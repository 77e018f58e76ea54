//! Channel renderers
//!
//! A renderer turns an envelope into the text for one channel. Renderers are
//! pure: the same envelope always yields the same payload.

use contracts::{ChannelKind, ChannelTemplateConfig, ContentEnvelope, RenderedPayload};

/// Pure envelope → payload function for one channel
pub trait ChannelRenderer: Send + Sync {
    fn render(&self, envelope: &ContentEnvelope, kind: ChannelKind) -> RenderedPayload;
}

/// Placeholder-based renderer
///
/// Supported placeholders: `{id}` `{title}` `{body}` `{link}` `{tags}`
/// `{hashtags}` `{meta.KEY}`. Unknown placeholders are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRenderer {
    format: String,
    title: Option<String>,
    recipient: Option<String>,
    max_chars: Option<usize>,
}

impl FormatRenderer {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            title: None,
            recipient: None,
            max_chars: None,
        }
    }

    /// Title template (same placeholders as the body)
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Truncate the rendered text to at most `max_chars` characters
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn from_config(config: &ChannelTemplateConfig) -> Self {
        Self {
            format: config.format.clone(),
            title: config.title.clone(),
            recipient: config.recipient.clone(),
            max_chars: config.max_chars,
        }
    }
}

impl ChannelRenderer for FormatRenderer {
    fn render(&self, envelope: &ContentEnvelope, kind: ChannelKind) -> RenderedPayload {
        let text = interpolate(&self.format, envelope);
        let text = match self.max_chars {
            Some(max) => truncate_chars(text.trim_end(), max),
            None => text.trim_end().to_string(),
        };

        RenderedPayload {
            channel: kind,
            variant: None,
            text,
            title: self
                .title
                .as_deref()
                .map(|t| interpolate(t, envelope).trim().to_string()),
            tags: envelope.tags().iter().cloned().collect(),
            recipient: self.recipient.clone(),
        }
    }
}

/// Closure-backed renderer
pub struct FnRenderer<F>(F);

impl<F> FnRenderer<F>
where
    F: Fn(&ContentEnvelope, ChannelKind) -> RenderedPayload + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ChannelRenderer for FnRenderer<F>
where
    F: Fn(&ContentEnvelope, ChannelKind) -> RenderedPayload + Send + Sync,
{
    fn render(&self, envelope: &ContentEnvelope, kind: ChannelKind) -> RenderedPayload {
        (self.0)(envelope, kind)
    }
}

/// Replace `{placeholder}` tokens with envelope fields
pub fn interpolate(template: &str, envelope: &ContentEnvelope) -> String {
    let mut out = String::with_capacity(template.len() + envelope.body().len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match resolve(name, envelope) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn resolve(name: &str, envelope: &ContentEnvelope) -> Option<String> {
    if let Some(key) = name.strip_prefix("meta.") {
        return Some(envelope.metadata().get(key).cloned().unwrap_or_default());
    }
    let value = match name {
        "id" => envelope.id().to_string(),
        "title" => envelope.title().to_string(),
        "body" => envelope.body().to_string(),
        "link" => envelope.link().unwrap_or_default().to_string(),
        "tags" => envelope
            .tags()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        "hashtags" => envelope
            .tags()
            .iter()
            .map(|t| format!("#{}", t.replace(char::is_whitespace, "")))
            .collect::<Vec<_>>()
            .join(" "),
        _ => return None,
    };
    Some(value)
}

/// Truncate to `max` characters, ending with an ellipsis when cut
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}
