//! Destination documents and their nested item kinds.
//!
//! A destination exclusively belongs to one scope (a user or a
//! collaborative space) and owns four nested arrays. Nested items carry a
//! client-clock string id as their only identity key; mutations rewrite
//! the whole document under a revision counter (see `services::trips`).

use serde::{Deserialize, Serialize};

/// Generate a client-clock item id (millisecond timestamp, stringly).
pub fn new_item_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// A trip destination (`{scope}/destinations/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Document ID, duplicated into the body for convenience
    pub id: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    /// Inclusive date range, ISO 8601 dates; start <= end
    pub start_date: String,
    pub end_date: String,
    /// Display color chosen by the user
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Cover images resolved client-side via the image API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary_image_url: Option<String>,
    #[serde(default)]
    pub notes: Vec<DestinationNote>,
    #[serde(default)]
    pub events: Vec<ItineraryEvent>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub files: Vec<TripFile>,
    /// Bumped on every whole-document rewrite; the write-conflict guard
    #[serde(default)]
    pub revision: u64,
}

/// Free-form note attached to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationNote {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// Itinerary event. May have at most one linked file, associated by the
/// file's `event_id` back-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryEvent {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Expense recorded against a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub concept: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Uploaded file reference. `event_id` links the file to an itinerary
/// event; the association is non-owning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripFile {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl Destination {
    /// Replace any file linked to `event_id` with `file`.
    pub fn attach_event_file(&mut self, event_id: &str, file: TripFile) {
        self.files
            .retain(|f| f.event_id.as_deref() != Some(event_id));
        self.files.push(file);
    }

    /// Drop an event and every file linked to it.
    pub fn remove_event(&mut self, event_id: &str) {
        self.events.retain(|e| e.id != event_id);
        self.files
            .retain(|f| f.event_id.as_deref() != Some(event_id));
    }
}
