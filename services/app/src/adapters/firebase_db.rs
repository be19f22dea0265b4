//! services/app/src/adapters/firebase_db.rs
//!
//! This module contains the catalog adapter, the concrete implementation of
//! the `CatalogStore` port. It talks to the Firebase Realtime Database over its
//! REST interface using `reqwest`.

use async_trait::async_trait;
use learnlingo_core::catalog::compare_keys;
use learnlingo_core::domain::{CatalogPage, Review, Tutor};
use learnlingo_core::ports::{CatalogStore, PortError, PortResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A catalog adapter that implements the `CatalogStore` port.
#[derive(Clone)]
pub struct FirebaseCatalogAdapter {
    client: Client,
    database_url: String,
    path: String,
}

impl FirebaseCatalogAdapter {
    /// Creates a new adapter reading the node at `path` under `database_url`.
    pub fn new(client: Client, database_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client,
            database_url: database_url.into().trim_end_matches('/').to_string(),
            path: path.into().trim_matches('/').to_string(),
        }
    }

    fn node_url(&self) -> String {
        if self.path.is_empty() {
            format!("{}/.json", self.database_url)
        } else {
            format!("{}/{}.json", self.database_url, self.path)
        }
    }

    async fn get_node(&self, query: &[(&str, String)]) -> PortResult<Value> {
        let response = self
            .client
            .get(self.node_url())
            .query(query)
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::RemoteUnavailable(format!(
                "catalog read failed with {}: {}",
                status, body
            )));
        }
        response.json::<Value>().await.map_err(unavailable)
    }
}

fn unavailable(e: reqwest::Error) -> PortError {
    PortError::RemoteUnavailable(e.to_string())
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

/// A review as stored in the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewRecord {
    pub reviewer_name: String,
    pub reviewer_rating: f64,
    pub comment: String,
}

/// A tutor as stored in the database. The key is not part of the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorRecord {
    pub name: String,
    pub surname: String,
    pub languages: Vec<String>,
    pub levels: Vec<String>,
    pub rating: f64,
    pub reviews: Vec<ReviewRecord>,
    pub price_per_hour: f64,
    pub lessons_done: u64,
    pub avatar_url: String,
    pub lesson_info: String,
    pub conditions: Vec<String>,
    pub experience: String,
}

impl TutorRecord {
    pub fn into_domain(self, id: String) -> Tutor {
        Tutor {
            id,
            name: self.name,
            surname: self.surname,
            avatar_url: self.avatar_url,
            languages: self.languages,
            levels: self.levels,
            price_per_hour: self.price_per_hour.max(0.0),
            lessons_done: self.lessons_done,
            rating: self.rating.clamp(0.0, 5.0),
            lesson_info: self.lesson_info,
            conditions: self.conditions,
            experience: self.experience,
            reviews: self
                .reviews
                .into_iter()
                .map(|r| Review {
                    reviewer_name: r.reviewer_name,
                    reviewer_rating: r.reviewer_rating,
                    comment: r.comment,
                })
                .collect(),
        }
    }

    pub fn from_domain(tutor: &Tutor) -> Self {
        Self {
            name: tutor.name.clone(),
            surname: tutor.surname.clone(),
            languages: tutor.languages.clone(),
            levels: tutor.levels.clone(),
            rating: tutor.rating,
            reviews: tutor
                .reviews
                .iter()
                .map(|r| ReviewRecord {
                    reviewer_name: r.reviewer_name.clone(),
                    reviewer_rating: r.reviewer_rating,
                    comment: r.comment.clone(),
                })
                .collect(),
            price_per_hour: tutor.price_per_hour,
            lessons_done: tutor.lessons_done,
            avatar_url: tutor.avatar_url.clone(),
            lesson_info: tutor.lesson_info.clone(),
            conditions: tutor.conditions.clone(),
            experience: tutor.experience.clone(),
        }
    }
}

/// Turns a node value into tutors in key order.
///
/// `null` is an empty catalog. Anything but an object of records is treated
/// as a broken backend. Individual records that fail to parse are skipped.
pub fn parse_catalog_node(value: Value) -> PortResult<Vec<Tutor>> {
    let entries = sorted_entries(value)?;
    Ok(parse_entries(entries))
}

/// Builds a page from a node fetched with `limitToFirst = page_size + 1`.
///
/// `has_more` and the cursor come from the raw keys, so a malformed record
/// never ends pagination early or moves the cursor backwards.
pub fn parse_catalog_page(value: Value, page_size: usize) -> PortResult<CatalogPage> {
    let mut entries = sorted_entries(value)?;
    let has_more = entries.len() > page_size;
    entries.truncate(page_size);
    let next_cursor = entries.last().map(|(key, _)| key.clone());
    Ok(CatalogPage {
        entries: parse_entries(entries),
        next_cursor,
        has_more,
    })
}

fn sorted_entries(value: Value) -> PortResult<Vec<(String, Value)>> {
    let map = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(PortError::RemoteUnavailable(format!(
                "expected an object of tutors, got {}",
                json_kind(&other)
            )))
        }
    };
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    Ok(entries)
}

fn parse_entries(entries: Vec<(String, Value)>) -> Vec<Tutor> {
    let mut tutors = Vec::with_capacity(entries.len());
    for (key, raw) in entries {
        match serde_json::from_value::<TutorRecord>(raw) {
            Ok(record) => tutors.push(record.into_domain(key)),
            Err(e) => warn!("Skipping malformed tutor record {}: {}", key, e),
        }
    }
    tutors
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for FirebaseCatalogAdapter {
    async fn fetch_all(&self) -> PortResult<Vec<Tutor>> {
        let node = self.get_node(&[]).await.map_err(|e| {
            error!("Error fetching tutors: {:?}", e);
            e
        })?;
        let tutors = parse_catalog_node(node)?;
        debug!(count = tutors.len(), "Fetched all tutors.");
        Ok(tutors)
    }

    async fn fetch_page(&self, page_size: usize, cursor: Option<&str>) -> PortResult<CatalogPage> {
        if page_size == 0 {
            return Err(PortError::InvalidArgument("page size must be positive".to_string()));
        }
        // Query parameter values must be JSON encoded.
        let mut query = vec![
            ("orderBy", "\"$key\"".to_string()),
            ("limitToFirst", (page_size + 1).to_string()),
        ];
        if let Some(key) = cursor {
            let encoded =
                serde_json::to_string(key).map_err(|e| PortError::Unexpected(e.to_string()))?;
            query.push(("startAfter", encoded));
        }

        let node = self.get_node(&query).await.map_err(|e| {
            error!("Error fetching paginated tutors: {:?}", e);
            e
        })?;
        let page = parse_catalog_page(node, page_size)?;
        debug!(
            count = page.entries.len(),
            next_cursor = ?page.next_cursor,
            has_more = page.has_more,
            "Fetched tutor page."
        );
        Ok(page)
    }

    async fn replace_all(&self, entries: Vec<Tutor>) -> PortResult<()> {
        let body: BTreeMap<String, TutorRecord> = entries
            .iter()
            .map(|t| (t.id.clone(), TutorRecord::from_domain(t)))
            .collect();
        let response = self
            .client
            .put(self.node_url())
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Error initializing tutors data: {} {}", status, body);
            return Err(PortError::RemoteUnavailable(format!(
                "catalog write failed with {}",
                status
            )));
        }
        info!(count = entries.len(), "Tutors data initialized successfully.");
        Ok(())
    }
}
