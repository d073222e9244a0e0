//! HTTP handler modules for docproc-api.

pub mod documents;
pub mod health;
pub mod search;
pub mod tags;
