//! Enhancements: annotations, definitions, and rabbitholes
//!
//! An enhancement is a user- or system-created artifact attached to a text
//! range within a block. The payload is a tagged union discriminated by
//! `type` on the wire, matching the upstream API.

use chrono::{DateTime, Utc};

use crate::anchor::Anchor;

/// Kind discriminant, used for z-ordering and styling in the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnhancementKind {
    Annotation,
    Definition,
    Rabbithole,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnhancementData {
    /// A saved note. An empty `note` signals deletion intent at the API
    /// boundary; it never persists in the store.
    Annotation { note: String },
    Definition {
        term: String,
        definition: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    /// A side conversation anchored to a selection.
    Rabbithole { conversation_id: String },
}

impl EnhancementData {
    pub fn kind(&self) -> EnhancementKind {
        match self {
            EnhancementData::Annotation { .. } => EnhancementKind::Annotation,
            EnhancementData::Definition { .. } => EnhancementKind::Definition,
            EnhancementData::Rabbithole { .. } => EnhancementKind::Rabbithole,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Enhancement {
    /// Unique within the owning block; server- or client-issued.
    pub id: String,
    pub block_id: String,
    /// The captured substring, kept for display and debugging.
    pub text: String,
    #[serde(rename = "text_range")]
    pub anchor: Anchor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: EnhancementData,
}

impl Enhancement {
    pub fn new(
        id: impl Into<String>,
        block_id: impl Into<String>,
        text: impl Into<String>,
        anchor: Anchor,
        data: EnhancementData,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            block_id: block_id.into(),
            text: text.into(),
            anchor,
            created_at: now,
            updated_at: now,
            data,
        }
    }

    pub fn kind(&self) -> EnhancementKind {
        self.data.kind()
    }
}
