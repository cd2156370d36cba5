//! Filter criteria for the audit log listing.
//!
//! A [`FilterState`] is an immutable snapshot. Only non-empty values are
//! stored, keyed by [`FilterKey`] whose declaration order is the canonical
//! encoding order, so two states compare equal exactly when they would
//! produce the same request.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::{Date, macros::format_description};
use url::form_urlencoded;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Entity,
    Username,
    Label,
    Action,
    From,
    To,
}

impl FilterKey {
    pub const ALL: [FilterKey; 6] = [
        FilterKey::Entity,
        FilterKey::Username,
        FilterKey::Label,
        FilterKey::Action,
        FilterKey::From,
        FilterKey::To,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Entity => "entity",
            FilterKey::Username => "username",
            FilterKey::Label => "label",
            FilterKey::Action => "action",
            FilterKey::From => "from",
            FilterKey::To => "to",
        }
    }
}

impl FromStr for FilterKey {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FilterKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| DomainError::validation(format!("unknown filter `{value}`")))
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of change recorded by the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Modified,
    Deleted,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Modified => "modified",
            AuditAction::Deleted => "deleted",
        }
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created" => Ok(AuditAction::Created),
            "modified" => Ok(AuditAction::Modified),
            "deleted" => Ok(AuditAction::Deleted),
            other => Err(DomainError::validation(format!(
                "action must be one of created, modified, deleted (got `{other}`)"
            ))),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a `YYYY-MM-DD` calendar date as used by the `from`/`to` filters.
pub fn parse_filter_date(value: &str) -> Result<Date, DomainError> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| DomainError::validation(format!("invalid date `{value}`: {err}")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FilterState {
    values: BTreeMap<FilterKey, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from `(key, value)` pairs in any order.
    ///
    /// Later pairs replace earlier ones for the same key; empty values clear
    /// the key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        pairs.into_iter().try_fold(Self::new(), |state, (key, value)| {
            let key = FilterKey::from_str(key.as_ref())?;
            state.with(key, value)
        })
    }

    /// Read the filters carried by a query string, ignoring parameters that
    /// are not filters (such as `pageNumber`).
    pub fn from_query(query: &str) -> Result<Self, DomainError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes()).try_fold(Self::new(), |state, (key, value)| {
            match FilterKey::from_str(&key) {
                Ok(key) => state.with(key, value.into_owned()),
                Err(_) => Ok(state),
            }
        })
    }

    /// Return a copy with `key` set to `value`; an empty value removes the key.
    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&key);
            return Ok(self);
        }
        validate(key, &value)?;
        self.values.insert(key, value);
        Ok(self)
    }

    pub fn without(mut self, key: FilterKey) -> Self {
        self.values.remove(&key);
        self
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn action(&self) -> Option<AuditAction> {
        self.get(FilterKey::Action)
            .and_then(|value| AuditAction::from_str(value).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Effective filters in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }

    /// Append every effective filter to a form serializer in canonical order.
    pub fn append_to<T>(&self, serializer: &mut form_urlencoded::Serializer<'_, T>)
    where
        T: form_urlencoded::Target,
    {
        for (key, value) in self.iter() {
            serializer.append_pair(key.as_str(), value);
        }
    }
}

fn validate(key: FilterKey, value: &str) -> Result<(), DomainError> {
    match key {
        FilterKey::Action => AuditAction::from_str(value).map(|_| ()),
        FilterKey::From | FilterKey::To => parse_filter_date(value).map(|_| ()),
        FilterKey::Entity | FilterKey::Username | FilterKey::Label => Ok(()),
    }
}
