//! AgileManifest: an agile backlog where epics, features, user stories and
//! leaf items form a validated hierarchy.
//!
//! Parent relations, the type registry and the hierarchy rules live in the
//! `hierarchy_core` crate. This crate stores the records, wires the record
//! services into the registry, and serves them over HTTP.

pub mod api;
pub mod backlog;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod tree_render;
