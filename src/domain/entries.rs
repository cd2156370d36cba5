//! Audit log entries and pages as handed to the presentation layer.

use std::num::NonZeroU32;

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub entity: String,
    pub user: String,
    pub action: String,
    pub entry: String,
}

/// One page of the filtered audit log.
///
/// `page` is the 1-based page that was served; `page_total` is zero when the
/// filtered log holds no entries at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogPage {
    pub entries: Vec<AuditLogEntry>,
    pub page: NonZeroU32,
    pub page_total: u32,
    pub labels: Option<Vec<String>>,
}

impl AuditLogPage {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a paginator needs to be shown at all.
    pub fn is_paginated(&self) -> bool {
        self.page_total > 1
    }
}
