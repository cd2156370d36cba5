//! Text and JSON views of a committed audit log page.

use std::fmt::Write as _;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::application::extensions::VIEWER_TITLE;
use crate::application::viewer::{CommittedView, ViewOutcome};
use crate::domain::entries::{AuditLogEntry, AuditLogPage};
use crate::domain::filters::{AuditAction, FilterState};

const EMPTY_NOTICE: &str = "No audit log entries found.";

/// `Audit Log`, or `Audit Log - page X of Y` when the log spans several pages.
pub fn document_title(page: Option<&AuditLogPage>) -> String {
    match page {
        Some(page) if page.is_paginated() => {
            format!("{VIEWER_TITLE} - page {} of {}", page.page, page.page_total)
        }
        _ => VIEWER_TITLE.to_string(),
    }
}

/// Choices of the action filter; the empty value means "any action".
pub fn action_options() -> Vec<(&'static str, &'static str)> {
    let mut options = vec![("", "All actions")];
    options.extend(
        [
            AuditAction::Created,
            AuditAction::Modified,
            AuditAction::Deleted,
        ]
        .map(|action| (action.as_str(), action.as_str())),
    );
    options
}

/// Choices of the label filter, built from the facet of the current page.
pub fn label_options(labels: &[String]) -> Vec<String> {
    std::iter::once(String::new())
        .chain(labels.iter().cloned())
        .collect()
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.to_string())
}

fn render_entry(out: &mut String, entry: &AuditLogEntry) {
    let _ = writeln!(
        out,
        "{} {} {} {}",
        format_timestamp(entry.timestamp),
        entry.user,
        entry.action,
        entry.entity
    );
    for line in entry.entry.lines() {
        let _ = writeln!(out, "    {line}");
    }
}

/// Plain-text rendering of a committed view.
pub fn render_text(view: &CommittedView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", document_title(view.page()));

    match &view.outcome {
        ViewOutcome::Loaded {
            page,
            redirected_from,
        } => {
            if let Some(asked_for) = redirected_from {
                let _ = writeln!(
                    out,
                    "Page {asked_for} does not exist; showing page {} instead.",
                    page.page
                );
            }
            if let Some(labels) = page.labels.as_deref().filter(|labels| !labels.is_empty()) {
                let _ = writeln!(out, "Labels: {}", labels.join(", "));
            }
            if page.is_empty() {
                let _ = writeln!(out, "{EMPTY_NOTICE}");
            }
            for entry in &page.entries {
                render_entry(&mut out, entry);
            }
        }
        ViewOutcome::Failed { failure } => {
            let _ = writeln!(out, "{}", failure.notification());
        }
    }
    out
}

#[derive(Serialize)]
struct FilterOptions {
    action: Vec<&'static str>,
    label: Vec<String>,
}

#[derive(Serialize)]
struct JsonView<'a> {
    title: String,
    route: String,
    filters: &'a FilterState,
    options: FilterOptions,
    #[serde(flatten)]
    outcome: &'a ViewOutcome,
}

/// JSON rendering of a committed view.
pub fn render_json(view: &CommittedView) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonView {
        title: document_title(view.page()),
        route: view.route(),
        filters: &view.request.filters,
        options: FilterOptions {
            action: action_options().into_iter().map(|(value, _)| value).collect(),
            label: label_options(
                view.page()
                    .and_then(|page| page.labels.as_deref())
                    .unwrap_or_default(),
            ),
        },
        outcome: &view.outcome,
    })
}
