// SPDX-License-Identifier: MIT

//! Trip data service: destinations and their nested collections, plus the
//! top-level personal notes/docs/tags, all addressed through an explicit
//! [`ScopePath`] the caller resolved for this one operation.
//!
//! Nested-array mutations rewrite the whole destination document through
//! `FirestoreDb::mutate_destination`, which re-reads and retries under a
//! revision counter, so two members of a space editing the same
//! destination do not lose each other's writes.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{
    new_item_id, Destination, DestinationNote, Expense, ItineraryEvent, NoteTag, PersonalDoc,
    PersonalNote, TripFile,
};
use crate::scope::ScopePath;
use serde::Deserialize;
use validator::Validate;

/// New destination payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDestination {
    #[validate(length(min = 1, max = 120))]
    pub city: String,
    #[validate(length(min = 1, max = 120))]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    pub start_date: String,
    pub end_date: String,
    pub color: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub destination_image_url: Option<String>,
    #[serde(default)]
    pub itinerary_image_url: Option<String>,
}

/// Partial update of a destination's own fields (never its nested arrays).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPatch {
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub color: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub destination_image_url: Option<String>,
    pub itinerary_image_url: Option<String>,
}

/// Expense payload (create or update).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    #[validate(length(min = 1, max = 200))]
    pub concept: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Event payload. With an `id` this updates the existing event; with
/// `file_url`/`file_name` it also (re)attaches the event's linked file.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// File payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FileDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Personal note payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalNoteDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Personal doc payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDocDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub url: String,
}

/// Scope-threaded CRUD over trip data.
#[derive(Clone)]
pub struct TripService {
    db: FirestoreDb,
}

impl TripService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    // ─── Destinations ────────────────────────────────────────────

    pub async fn list_destinations(&self, scope: &ScopePath) -> Result<Vec<Destination>, AppError> {
        self.db.list_destinations(scope).await
    }

    pub async fn get_destination(
        &self,
        scope: &ScopePath,
        id: &str,
    ) -> Result<Destination, AppError> {
        self.db
            .get_destination(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Destination {} not found", id)))
    }

    pub async fn add_destination(
        &self,
        scope: &ScopePath,
        draft: NewDestination,
    ) -> Result<Destination, AppError> {
        if draft.start_date > draft.end_date {
            return Err(AppError::BadRequest(
                "Start date must not be after end date".into(),
            ));
        }

        let destination = Destination {
            id: new_item_id(),
            city: draft.city,
            country: draft.country,
            country_code: draft.country_code,
            start_date: draft.start_date,
            end_date: draft.end_date,
            color: draft.color,
            lat: draft.lat,
            lng: draft.lng,
            destination_image_url: draft.destination_image_url,
            itinerary_image_url: draft.itinerary_image_url,
            notes: vec![],
            events: vec![],
            expenses: vec![],
            files: vec![],
            revision: 0,
        };

        self.db.set_destination(scope, &destination).await?;
        tracing::info!(scope = %scope, destination = %destination.id, "Destination created");
        Ok(destination)
    }

    pub async fn update_destination(
        &self,
        scope: &ScopePath,
        id: &str,
        patch: DestinationPatch,
    ) -> Result<Destination, AppError> {
        self.db
            .mutate_destination(scope, id, move |dest| {
                if let Some(city) = &patch.city {
                    dest.city = city.clone();
                }
                if let Some(country) = &patch.country {
                    dest.country = country.clone();
                }
                if let Some(code) = &patch.country_code {
                    dest.country_code = code.clone();
                }
                if let Some(start) = &patch.start_date {
                    dest.start_date = start.clone();
                }
                if let Some(end) = &patch.end_date {
                    dest.end_date = end.clone();
                }
                if let Some(color) = &patch.color {
                    dest.color = color.clone();
                }
                if let Some(lat) = patch.lat {
                    dest.lat = Some(lat);
                }
                if let Some(lng) = patch.lng {
                    dest.lng = Some(lng);
                }
                if let Some(url) = &patch.destination_image_url {
                    dest.destination_image_url = Some(url.clone());
                }
                if let Some(url) = &patch.itinerary_image_url {
                    dest.itinerary_image_url = Some(url.clone());
                }
                if dest.start_date > dest.end_date {
                    return Err(AppError::BadRequest(
                        "Start date must not be after end date".into(),
                    ));
                }
                Ok(())
            })
            .await
    }

    pub async fn delete_destination(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        self.db.delete_destination(scope, id).await?;
        tracing::info!(scope = %scope, destination = id, "Destination deleted");
        Ok(())
    }

    // ─── Destination Notes ───────────────────────────────────────

    pub async fn add_note(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        text: &str,
    ) -> Result<DestinationNote, AppError> {
        let note = DestinationNote {
            id: new_item_id(),
            text: text.to_string(),
            completed: false,
        };
        let pushed = note.clone();

        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.notes.push(pushed.clone());
                Ok(())
            })
            .await?;

        Ok(note)
    }

    pub async fn update_note(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        note_id: &str,
        text: &str,
    ) -> Result<Destination, AppError> {
        let note_id = note_id.to_string();
        let text = text.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                let note = dest
                    .notes
                    .iter_mut()
                    .find(|n| n.id == note_id)
                    .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))?;
                note.text = text.clone();
                Ok(())
            })
            .await
    }

    pub async fn toggle_note(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        note_id: &str,
    ) -> Result<Destination, AppError> {
        let note_id = note_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                let note = dest
                    .notes
                    .iter_mut()
                    .find(|n| n.id == note_id)
                    .ok_or_else(|| AppError::NotFound(format!("Note {} not found", note_id)))?;
                note.completed = !note.completed;
                Ok(())
            })
            .await
    }

    pub async fn delete_note(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        note_id: &str,
    ) -> Result<Destination, AppError> {
        let note_id = note_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.notes.retain(|n| n.id != note_id);
                Ok(())
            })
            .await
    }

    // ─── Expenses ────────────────────────────────────────────────

    pub async fn add_expense(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        draft: ExpenseDraft,
    ) -> Result<Expense, AppError> {
        let expense = Expense {
            id: new_item_id(),
            concept: draft.concept,
            amount: draft.amount,
            currency: draft.currency,
            category: draft.category,
            date: draft.date,
        };
        let pushed = expense.clone();

        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.expenses.push(pushed.clone());
                Ok(())
            })
            .await?;

        Ok(expense)
    }

    pub async fn update_expense(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        expense_id: &str,
        draft: ExpenseDraft,
    ) -> Result<Destination, AppError> {
        let expense_id = expense_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                let expense = dest
                    .expenses
                    .iter_mut()
                    .find(|e| e.id == expense_id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Expense {} not found", expense_id))
                    })?;
                expense.concept = draft.concept.clone();
                expense.amount = draft.amount;
                expense.currency = draft.currency.clone();
                expense.category = draft.category.clone();
                expense.date = draft.date.clone();
                Ok(())
            })
            .await
    }

    pub async fn delete_expense(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        expense_id: &str,
    ) -> Result<Destination, AppError> {
        let expense_id = expense_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.expenses.retain(|e| e.id != expense_id);
                Ok(())
            })
            .await
    }

    // ─── Files ───────────────────────────────────────────────────

    pub async fn add_file(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        draft: FileDraft,
    ) -> Result<TripFile, AppError> {
        let file = TripFile {
            id: new_item_id(),
            name: draft.name,
            url: draft.url,
            event_id: draft.event_id,
        };
        let pushed = file.clone();

        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.files.push(pushed.clone());
                Ok(())
            })
            .await?;

        Ok(file)
    }

    pub async fn update_file(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        file_id: &str,
        draft: FileDraft,
    ) -> Result<Destination, AppError> {
        let file_id = file_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                let file = dest
                    .files
                    .iter_mut()
                    .find(|f| f.id == file_id)
                    .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
                file.name = draft.name.clone();
                file.url = draft.url.clone();
                file.event_id = draft.event_id.clone();
                Ok(())
            })
            .await
    }

    pub async fn delete_file(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        file_id: &str,
    ) -> Result<Destination, AppError> {
        let file_id = file_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.files.retain(|f| f.id != file_id);
                Ok(())
            })
            .await
    }

    // ─── Itinerary Events ────────────────────────────────────────

    /// Create or update an event; when the draft carries an attachment,
    /// the event's linked file is replaced in the same document write.
    pub async fn upsert_event(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        draft: EventDraft,
    ) -> Result<ItineraryEvent, AppError> {
        let event_id = draft.id.clone().unwrap_or_else(new_item_id);
        let is_update = draft.id.is_some();

        let event = ItineraryEvent {
            id: event_id.clone(),
            title: draft.title.clone(),
            date: draft.date.clone(),
            time: draft.time.clone(),
            location: draft.location.clone(),
            category: draft.category.clone(),
            completed: false,
        };

        let attachment = match (&draft.file_url, &draft.file_name) {
            (Some(url), Some(name)) => Some(TripFile {
                id: new_item_id(),
                name: name.clone(),
                url: url.clone(),
                event_id: Some(event_id.clone()),
            }),
            _ => None,
        };

        let saved = event.clone();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                if is_update {
                    let existing = dest
                        .events
                        .iter_mut()
                        .find(|e| e.id == saved.id)
                        .ok_or_else(|| {
                            AppError::NotFound(format!("Event {} not found", saved.id))
                        })?;
                    // Preserve the completion flag across edits
                    let completed = existing.completed;
                    *existing = saved.clone();
                    existing.completed = completed;
                } else {
                    dest.events.push(saved.clone());
                }

                if let Some(file) = &attachment {
                    dest.attach_event_file(&saved.id, file.clone());
                }
                Ok(())
            })
            .await?;

        Ok(event)
    }

    /// Delete an event and any file linked to it.
    pub async fn delete_event(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        event_id: &str,
    ) -> Result<Destination, AppError> {
        let event_id = event_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                dest.remove_event(&event_id);
                Ok(())
            })
            .await
    }

    pub async fn toggle_event(
        &self,
        scope: &ScopePath,
        dest_id: &str,
        event_id: &str,
    ) -> Result<Destination, AppError> {
        let event_id = event_id.to_string();
        self.db
            .mutate_destination(scope, dest_id, move |dest| {
                let event = dest
                    .events
                    .iter_mut()
                    .find(|e| e.id == event_id)
                    .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
                event.completed = !event.completed;
                Ok(())
            })
            .await
    }

    // ─── Personal Notes ──────────────────────────────────────────

    pub async fn list_personal_notes(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<PersonalNote>, AppError> {
        self.db.list_personal_notes(scope).await
    }

    pub async fn add_personal_note(
        &self,
        scope: &ScopePath,
        draft: PersonalNoteDraft,
    ) -> Result<PersonalNote, AppError> {
        let note = PersonalNote {
            id: new_item_id(),
            title: draft.title,
            text: draft.text,
            tags: draft.tags,
            completed: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.db.set_personal_note(scope, &note).await?;
        Ok(note)
    }

    pub async fn update_personal_note(
        &self,
        scope: &ScopePath,
        id: &str,
        draft: PersonalNoteDraft,
    ) -> Result<PersonalNote, AppError> {
        let mut note = self
            .db
            .get_personal_note(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

        note.title = draft.title;
        note.text = draft.text;
        note.tags = draft.tags;
        self.db.set_personal_note(scope, &note).await?;
        Ok(note)
    }

    pub async fn toggle_personal_note(
        &self,
        scope: &ScopePath,
        id: &str,
    ) -> Result<PersonalNote, AppError> {
        let mut note = self
            .db
            .get_personal_note(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note {} not found", id)))?;

        note.completed = !note.completed;
        self.db.set_personal_note(scope, &note).await?;
        Ok(note)
    }

    pub async fn delete_personal_note(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        self.db.delete_personal_note(scope, id).await
    }

    // ─── Personal Note Tags ──────────────────────────────────────

    pub async fn list_note_tags(&self, scope: &ScopePath) -> Result<Vec<String>, AppError> {
        Ok(self
            .db
            .list_note_tags(scope)
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect())
    }

    pub async fn add_note_tag(&self, scope: &ScopePath, tag: &str) -> Result<(), AppError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::BadRequest("Tag must not be empty".into()));
        }
        self.db
            .set_note_tag(
                scope,
                &NoteTag {
                    tag: tag.to_string(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                },
            )
            .await
    }

    pub async fn delete_note_tag(&self, scope: &ScopePath, tag: &str) -> Result<(), AppError> {
        self.db.delete_note_tag(scope, tag).await
    }

    // ─── Personal Docs ───────────────────────────────────────────

    pub async fn list_personal_docs(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<PersonalDoc>, AppError> {
        self.db.list_personal_docs(scope).await
    }

    pub async fn add_personal_doc(
        &self,
        scope: &ScopePath,
        draft: PersonalDocDraft,
    ) -> Result<PersonalDoc, AppError> {
        let doc = PersonalDoc {
            id: new_item_id(),
            name: draft.name,
            url: draft.url,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.db.set_personal_doc(scope, &doc).await?;
        Ok(doc)
    }

    pub async fn delete_personal_doc(&self, scope: &ScopePath, id: &str) -> Result<(), AppError> {
        self.db.delete_personal_doc(scope, id).await
    }
}
