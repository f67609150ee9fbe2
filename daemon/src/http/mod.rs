//! Outbound HTTP: webhook trigger and status API client

pub mod client;
