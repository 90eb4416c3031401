// File: ./src/model/item.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Generates a fresh identifier for a record created on this client.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

// --- STATUS ---

/// Moderation status shared by both record kinds.
///
/// The set is open-ended: values we do not know about are preserved verbatim
/// so a round trip through this client never rewrites another client's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Other(s) => s,
        }
    }
}

impl From<String> for RecordStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "pending" => RecordStatus::Pending,
            "approved" => RecordStatus::Approved,
            "rejected" => RecordStatus::Rejected,
            _ => RecordStatus::Other(value),
        }
    }
}

impl From<&str> for RecordStatus {
    fn from(value: &str) -> Self {
        RecordStatus::from(value.to_string())
    }
}

impl From<RecordStatus> for String {
    fn from(value: RecordStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- RECORDS ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD` or empty.
    pub date: String,
    /// `HH:MM` (24h) or empty.
    pub time: String,
    pub location: String,
    pub district: String,
    pub accessibility: String,
    pub category: String,
    pub description: String,
    pub registration_link: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_methods: Vec<String>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelpService {
    pub id: String,
    pub org_name: String,
    pub help_type: String,
    pub description: String,
    pub district: String,
    /// Phone number or email address.
    pub contacts: String,
    pub is_free: bool,
    pub conditions: String,
    pub status: RecordStatus,
}

/// How a help service can be reached, derived from its free-form `contacts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactLink {
    Email(String),
    /// Digits and `+` only.
    Phone(String),
}

impl ContactLink {
    pub fn href(&self) -> String {
        match self {
            ContactLink::Email(addr) => format!("mailto:{}", addr),
            ContactLink::Phone(number) => format!("tel:{}", number),
        }
    }
}

impl HelpService {
    pub fn contact_link(&self) -> Option<ContactLink> {
        let contacts = self.contacts.trim();
        if contacts.is_empty() {
            return None;
        }
        if contacts.contains('@') {
            return Some(ContactLink::Email(contacts.to_string()));
        }
        let number: String = contacts
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        Some(ContactLink::Phone(number))
    }
}

/// Which collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    Event,
    Help,
}

/// Common behaviour of the two record kinds.
pub trait Record: Clone {
    const KIND: ItemKind;

    fn id(&self) -> &str;
    fn status_mut(&mut self) -> &mut RecordStatus;
}

impl Record for Event {
    const KIND: ItemKind = ItemKind::Event;

    fn id(&self) -> &str {
        &self.id
    }
    fn status_mut(&mut self) -> &mut RecordStatus {
        &mut self.status
    }
}

impl Record for HelpService {
    const KIND: ItemKind = ItemKind::Help;

    fn id(&self) -> &str {
        &self.id
    }
    fn status_mut(&mut self) -> &mut RecordStatus {
        &mut self.status
    }
}

/// The full pair of collections as exchanged with the remote endpoint and
/// local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub help: Vec<HelpService>,
}

impl Dataset {
    pub fn new(events: Vec<Event>, help: Vec<HelpService>) -> Self {
        Self { events, help }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.help.is_empty()
    }
}

/// Replace the record whose id matches, otherwise append. The input slice is
/// never touched.
pub fn upsert<T: Record>(current: &[T], item: T) -> Vec<T> {
    let mut out = current.to_vec();
    match out.iter().position(|existing| existing.id() == item.id()) {
        Some(idx) => out[idx] = item,
        None => out.push(item),
    }
    out
}

/// Copy of `current` without the record(s) carrying `id`.
pub fn remove_by_id<T: Record>(current: &[T], id: &str) -> Vec<T> {
    current
        .iter()
        .filter(|item| item.id() != id)
        .cloned()
        .collect()
}
