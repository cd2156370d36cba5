//! Wire types for the SCM-Manager audit log plugin endpoints.
//!
//! The host speaks HAL: links live under `_links`, nested collections under
//! `_embedded`. Every field the client treats as required is still modelled as
//! an `Option` here so that callers can report *which* field was missing
//! instead of surfacing a generic decode error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Link relation advertising the paginated audit log listing.
pub const AUDIT_LOG_REL: &str = "auditLog";
/// Link relation advertising the CSV export of the audit log.
pub const AUDIT_LOG_CSV_EXPORT_REL: &str = "auditLogCsvExport";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// A link relation may carry a single link or an array of links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkValue {
    One(Link),
    Many(Vec<Link>),
}

impl LinkValue {
    /// First href of the relation, if any.
    pub fn first_href(&self) -> Option<&str> {
        match self {
            LinkValue::One(link) => Some(link.href.as_str()),
            LinkValue::Many(links) => links.first().map(|link| link.href.as_str()),
        }
    }
}

/// The host's index resource. Only the links matter to this client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(rename = "_links", default)]
    pub links: BTreeMap<String, LinkValue>,
}

impl IndexDocument {
    pub fn href(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).and_then(LinkValue::first_href)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryDto {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub entity: String,
    pub user: String,
    pub action: String,
    pub entry: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsDto {
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEmbedded {
    #[serde(default)]
    pub entries: Option<Vec<LogEntryDto>>,
    #[serde(default)]
    pub labels: Option<LabelsDto>,
}

/// One page of the audit log as returned by `GET <auditLog>?pageNumber=n`.
///
/// The plugin backend reports `page` zero-based; `pageTotal` is zero when the
/// filtered log is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDocument {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_total: Option<u32>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<AuditLogEmbedded>,
    #[serde(rename = "_links", default)]
    pub links: BTreeMap<String, LinkValue>,
}
