//! Export links for the filtered audit log.

use time::OffsetDateTime;
use url::form_urlencoded::Serializer;

use super::request_key::join_query;
use crate::domain::filters::FilterState;

const EXPORT_FILE_PREFIX: &str = "scm-audit-log_";

/// Download link covering the whole filtered log, or `None` when the host
/// does not offer an export to the current caller.
pub fn compose(export_link: Option<&str>, filters: &FilterState) -> Option<String> {
    let link = export_link?;
    let mut serializer = Serializer::new(String::new());
    filters.append_to(&mut serializer);
    Some(join_query(link, &serializer.finish()))
}

/// File name for a CSV export downloaded at `now`.
pub fn export_filename(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("{EXPORT_FILE_PREFIX}{millis}.csv")
}
