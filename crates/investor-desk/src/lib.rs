//! Investor-relations back office: registrations, shareholdings verification, and review queues.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
