// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod destination;
pub mod invitation;
pub mod personal;
pub mod profile;
pub mod space;

pub use destination::{new_item_id, Destination, DestinationNote, Expense, ItineraryEvent, TripFile};
pub use invitation::{Invitation, InvitationStatus, InviteInbox};
pub use personal::{NoteTag, PersonalDoc, PersonalNote};
pub use profile::{TripMode, UserProfile, UsernameClaim};
pub use space::{CollaborativeSpace, SpaceStatus, MAX_SPACE_MEMBERS};
