//! Query composition, fetching and pagination of the audit log.

pub mod bounds;
pub mod error;
pub mod export;
pub mod extensions;
pub mod fetcher;
pub mod links;
pub mod pagination;
pub mod request_key;
pub mod viewer;
