//! # Activity log types
//!
//! Read and download events are append-only. Counts are event counts, so a
//! user who opens the same document twice contributes two reads.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::DomainError;
use crate::models::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Read,
    Download,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Read => "read",
            ActivityKind::Download => "download",
        }
    }
}

/// One event joined with the acting user, for per-item audit views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Names of every department the user belongs to
    pub departments: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Audit view of a single item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemActivity {
    /// Every read, newest first
    pub reads: Vec<ActivityRecord>,
    /// Latest download per user, newest first. Absent for notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<Vec<ActivityRecord>>,
}

/// Keeps only the most recent event per user, newest first.
pub fn latest_per_user(mut records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.user_id));
    records
}

/// The three event streams shown in the global audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    DocumentRead,
    DocumentDownload,
    NoteRead,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] =
        [LogCategory::DocumentRead, LogCategory::DocumentDownload, LogCategory::NoteRead];

    pub fn item_kind(&self) -> ItemKind {
        match self {
            LogCategory::DocumentRead | LogCategory::DocumentDownload => ItemKind::Document,
            LogCategory::NoteRead => ItemKind::Note,
        }
    }

    pub fn activity(&self) -> ActivityKind {
        match self {
            LogCategory::DocumentDownload => ActivityKind::Download,
            LogCategory::DocumentRead | LogCategory::NoteRead => ActivityKind::Read,
        }
    }
}

/// `?type=` filter of the audit log endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFilter {
    #[default]
    All,
    DocumentReads,
    DocumentDownloads,
    NoteReads,
}

impl LogFilter {
    pub fn categories(&self) -> Vec<LogCategory> {
        match self {
            LogFilter::All => LogCategory::ALL.to_vec(),
            LogFilter::DocumentReads => vec![LogCategory::DocumentRead],
            LogFilter::DocumentDownloads => vec![LogCategory::DocumentDownload],
            LogFilter::NoteReads => vec![LogCategory::NoteRead],
        }
    }
}

impl FromStr for LogFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(LogFilter::All),
            "document_reads" => Ok(LogFilter::DocumentReads),
            "document_downloads" => Ok(LogFilter::DocumentDownloads),
            "note_reads" => Ok(LogFilter::NoteReads),
            other => Err(DomainError::validation(format!("unknown log type '{other}'"))),
        }
    }
}

impl fmt::Display for LogFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogFilter::All => "all",
            LogFilter::DocumentReads => "document_reads",
            LogFilter::DocumentDownloads => "document_downloads",
            LogFilter::NoteReads => "note_reads",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    #[serde(rename = "type")]
    pub category: LogCategory,
    pub timestamp: DateTime<Utc>,
    pub item_id: i64,
    pub item_title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Merges per-category batches newest first and keeps at most `cap` rows.
pub fn merge_audit_log(batches: Vec<Vec<AuditEntry>>, cap: usize) -> Vec<AuditEntry> {
    let mut merged: Vec<AuditEntry> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(cap);
    merged
}
