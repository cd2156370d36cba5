//! Query composition and pagination core of the SCM-Manager audit log viewer.
//!
//! Filters and a page number are turned into a canonical request identity,
//! fetched once per identity, checked against the reported page total and
//! committed only while they are still the latest request.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
