//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Transaction ids and organization names travel as span/event fields
//! - Metrics are recorded through the `metrics` facade; no recorder means no cost
//! - The Prometheus exporter is installed only when enabled in config

pub mod logging;
pub mod metrics;
