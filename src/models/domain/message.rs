use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a tutor conversation.
///
/// Assistant parts are always parser output; user parts come straight from input.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub parts: Vec<ContentSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractions: Option<Extractions>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, parts: Vec<ContentSegment>) -> Self {
        Message {
            id: Uuid::new_v4(),
            role,
            parts,
            sources: None,
            extractions: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(parts: Vec<ContentSegment>) -> Self {
        Message::new(Role::User, parts)
    }

    pub fn assistant(parts: Vec<ContentSegment>) -> Self {
        Message::new(Role::Assistant, parts)
    }

    pub fn user_text(text: &str) -> Self {
        Message::user(vec![ContentSegment::text(text)])
    }

    pub fn assistant_text(text: &str) -> Self {
        Message::assistant(vec![ContentSegment::text(text)])
    }

    pub fn with_sources(mut self, sources: Vec<Citation>) -> Self {
        self.sources = (!sources.is_empty()).then_some(sources);
        self
    }

    pub fn with_extractions(mut self, extractions: Extractions) -> Self {
        self.extractions = (!extractions.is_empty()).then_some(extractions);
        self
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Concatenated text of every text segment, used when priming a model connection.
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentSegment::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn has_placeholders(&self) -> bool {
        self.parts.iter().any(ContentSegment::is_placeholder)
    }

    /// Copy safe for long-term storage: unresolved placeholders fall back to their directive text.
    pub fn persistable(&self) -> Message {
        let mut copy = self.clone();
        for part in copy.parts.iter_mut() {
            if let Some(prompt) = part.placeholder_prompt() {
                *part = ContentSegment::text(&format!("[GENERATE_IMAGE: \"{}\"]", prompt));
            }
        }
        copy
    }
}

/// Renderable piece of a message, in display order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    Text { text: String },
    Image { image: ImageContent },
    Chart { chart: ChartSpec },
    Flowchart { html: String },
}

impl ContentSegment {
    pub fn text(text: &str) -> Self {
        ContentSegment::Text {
            text: text.to_string(),
        }
    }

    pub fn image_placeholder(prompt: &str) -> Self {
        ContentSegment::Image {
            image: ImageContent::Placeholder {
                prompt: prompt.to_string(),
            },
        }
    }

    pub fn image(mime_type: &str, data: &str) -> Self {
        ContentSegment::Image {
            image: ImageContent::Resolved {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder_prompt().is_some()
    }

    pub fn placeholder_prompt(&self) -> Option<&str> {
        match self {
            ContentSegment::Image {
                image: ImageContent::Placeholder { prompt },
            } => Some(prompt.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageContent {
    /// Base64 image data ready for display.
    Resolved { mime_type: String, data: String },
    /// Transient: awaiting generation from `prompt`.
    Placeholder { prompt: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
    Line,
}

/// Chart payload carried by a `json-chart` fence.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: Vec<serde_json::Value>,
    pub data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_keys: Option<Vec<SeriesKey>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeriesKey {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Grounding reference attached to an assistant turn that used web lookup.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Definition {
    pub term: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Vocabulary {
    pub word: String,
    pub meaning: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Formula {
    pub name: String,
    pub expression: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractedEntity {
    Definition(Definition),
    Vocabulary(Vocabulary),
    Formula(Formula),
}

/// Entities lifted out of inline tags, grouped by kind for separate rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Extractions {
    #[serde(default)]
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub vocabulary: Vec<Vocabulary>,
    #[serde(default)]
    pub formulas: Vec<Formula>,
}

impl Extractions {
    pub fn push(&mut self, entity: ExtractedEntity) {
        match entity {
            ExtractedEntity::Definition(d) => self.definitions.push(d),
            ExtractedEntity::Vocabulary(v) => self.vocabulary.push(v),
            ExtractedEntity::Formula(f) => self.formulas.push(f),
        }
    }

    pub fn len(&self) -> usize {
        self.definitions.len() + self.vocabulary.len() + self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
