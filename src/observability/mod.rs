//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - Structured fields for ids, paths and statuses, never formatted strings
//! - Request ID attached to every dispatched request and logged with it
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
