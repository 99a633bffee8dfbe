//! HTTP API: the catalog service layer and its generic-call transport.

pub mod app;
pub mod config;
