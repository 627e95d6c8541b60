//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, when the binary enables it)
//! ```
//!
//! # Design Decisions
//! - Every confirmation run gets a span with a UUID run id
//! - Metrics are no-ops until a recorder is installed, so the library never
//!   requires an exporter

pub mod logging;
pub mod metrics;
