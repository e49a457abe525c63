//! AriaKey - device-bound license issuance, activation, and validation
//!
//! This library provides the core functionality for the AriaKey license
//! server: hashed license key storage, per-license activation limits,
//! and the HTTP surface that clients and admins talk to.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod keys;
pub mod middleware;
pub mod models;
