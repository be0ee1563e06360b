use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Range;

pub const TEXT_DISCRIMINATOR: &str = "http://vocab.lappsgrid.org/ns/media/text";
pub const LIF_DISCRIMINATOR: &str = "http://vocab.lappsgrid.org/ns/media/jsonld#lif";
pub const ERROR_DISCRIMINATOR: &str = "http://vocab.lappsgrid.org/ns/error";
pub const LIF_CONTEXT: &str = "http://vocab.lappsgrid.org/context-1.0.0.jsonld";

/// The unit handed from one service to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub discriminator: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Container(Container),
    Text(String),
}

/// Structured LIF payload.
///
/// `metadata` is always written out, even when empty: some services reject
/// a container without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub text: Text,
    #[serde(default)]
    pub views: Vec<View>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "@value")]
    pub value: String,
    #[serde(rename = "@language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One annotation layer, produced by one step of a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: ViewMetadata,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewMetadata {
    /// Annotation type URI -> producer info. Only the keys matter downstream.
    #[serde(default)]
    pub contains: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@type", alias = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub features: Map<String, Value>,
}

fn default_context() -> String {
    LIF_CONTEXT.to_string()
}

/// Last path segment of a type URI, e.g. `Token#pos` for
/// `http://vocab.lappsgrid.org/Token#pos`.
pub fn type_suffix(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

impl Document {
    /// A plain-text document, the usual input to the first step of a chain.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            discriminator: TEXT_DISCRIMINATOR.to_string(),
            payload: Payload::Text(text.into()),
        }
    }

    /// An empty LIF container around `text`, with no views yet.
    pub fn lif(text: impl Into<String>) -> Self {
        Self {
            discriminator: LIF_DISCRIMINATOR.to_string(),
            payload: Payload::Container(Container::new(text)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.discriminator == ERROR_DISCRIMINATOR
    }

    pub fn container(&self) -> Option<&Container> {
        match &self.payload {
            Payload::Container(container) => Some(container),
            Payload::Text(_) => None,
        }
    }

    /// The source text, whichever payload shape the document has.
    pub fn text_value(&self) -> &str {
        match &self.payload {
            Payload::Container(container) => &container.text.value,
            Payload::Text(text) => text,
        }
    }

    pub fn views(&self) -> &[View] {
        self.container().map(|c| c.views.as_slice()).unwrap_or(&[])
    }
}

impl Container {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            context: default_context(),
            metadata: Map::new(),
            text: Text {
                value: text.into(),
                language: None,
            },
            views: Vec::new(),
        }
    }
}

impl View {
    /// Full type URIs declared in `metadata.contains`, in wire order.
    pub fn annotation_types(&self) -> impl Iterator<Item = &str> {
        self.metadata.contains.keys().map(String::as_str)
    }
}

impl Annotation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            start: None,
            end: None,
            label: None,
            features: Map::new(),
        }
    }

    pub fn with_span(mut self, start: i64, end: i64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.features.insert(key.into(), value.into());
        self
    }

    pub fn type_suffix(&self) -> &str {
        type_suffix(&self.kind)
    }

    /// Feature value as display text: strings verbatim, anything else as JSON.
    pub fn feature(&self, key: &str) -> Option<String> {
        self.features.get(key).map(value_to_string)
    }

    /// Character range covered by the annotation, if both offsets are present
    /// and `0 <= start <= end <= text_len`.
    pub fn span(&self, text_len: usize) -> Option<Range<usize>> {
        let start = usize::try_from(self.start?).ok()?;
        let end = usize::try_from(self.end?).ok()?;
        (start <= end && end <= text_len).then_some(start..end)
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
