use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::content::Pagination;

/// Workflow state an admin assigns to a contact message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ContactStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "New",
            ContactStatus::InProgress => "In Progress",
            ContactStatus::Resolved => "Resolved",
            ContactStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "new" => Ok(ContactStatus::New),
            "in progress" => Ok(ContactStatus::InProgress),
            "resolved" => Ok(ContactStatus::Resolved),
            "closed" => Ok(ContactStatus::Closed),
            other => Err(format!("Unknown contact status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ContactPriority {
    Low,
    Medium,
    High,
}

impl ContactPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactPriority::Low => "Low",
            ContactPriority::Medium => "Medium",
            ContactPriority::High => "High",
        }
    }
}

impl FromStr for ContactPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ContactPriority::Low),
            "medium" => Ok(ContactPriority::Medium),
            "high" => Ok(ContactPriority::High),
            other => Err(format!("Unknown contact priority: {}", other)),
        }
    }
}

/// A message left through the public contact form, as the admin sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<ContactStatus>,
    #[serde(default)]
    pub priority: Option<ContactPriority>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Body of the public contact form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub subject: String,
    pub message: String,
}

/// Fields an admin may change on a contact message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContactStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ContactPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    #[serde(default)]
    pub total_contacts: u64,
    #[serde(default)]
    pub unread_contacts: u64,
}
