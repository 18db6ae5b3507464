//! Top-level personal collections, scoped like destinations but not
//! nested under one.

use serde::{Deserialize, Serialize};

/// Standalone note (`{scope}/personalNotes/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalNote {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
}

/// Document reference (`{scope}/personalDocs/{id}`). The content behind
/// `url` may be client-side encrypted; this layer never looks inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDoc {
    pub id: String,
    pub name: String,
    pub url: String,
    pub created_at: String,
}

/// Tag marker document (`{scope}/personalNoteTags/{tag}`). The tag string
/// doubles as the document ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    pub tag: String,
    pub created_at: String,
}
