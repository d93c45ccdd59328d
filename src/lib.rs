//! # IGA Provider Library
//!
//! Core of an infrastructure-as-code provider for an Identity Governance
//! platform: token lifecycle, 401 retry, per-family connection codecs,
//! endpoint codec and the resource adapters the host runtime drives.

pub mod client;
pub mod config;
pub mod connectors;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod models;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod telemetry;
pub mod token_refresh;
