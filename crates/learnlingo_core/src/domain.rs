//! crates/learnlingo_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// The database key of a catalog entry.
pub type TutorId = String;

/// A single review embedded in a tutor record.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub reviewer_name: String,
    pub reviewer_rating: f64,
    pub comment: String,
}

/// One tutor in the catalog.
///
/// Tutors are created and mutated only by the catalog owner; the client reads
/// them and, at setup time, seeds the whole catalog at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Tutor {
    pub id: TutorId,
    pub name: String,
    pub surname: String,
    pub avatar_url: String,
    pub languages: Vec<String>,
    pub levels: Vec<String>,
    pub price_per_hour: f64,
    pub lessons_done: u64,
    pub rating: f64,
    pub lesson_info: String,
    pub conditions: Vec<String>,
    pub experience: String,
    pub reviews: Vec<Review>,
}

impl Tutor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// The signed-in identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
    /// When the provider will consider this session expired, if it says.
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of the catalog in key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogPage {
    pub entries: Vec<Tutor>,
    /// Key of the last entry in `entries`; `None` when the page is empty.
    pub next_cursor: Option<TutorId>,
    pub has_more: bool,
}
