//! Prometheus metrics for pipeline runs.
//!
//! # Example
//!
//! ```ignore
//! use event_fanout::metrics::PrometheusReporter;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(PrometheusReporter::new()?);
//! let coordinator = coordinator.with_reporter(metrics.clone());
//! coordinator.run(events, 3).await?;
//! println!("{}", metrics.export());
//! ```

pub mod prometheus;

pub use self::prometheus::PrometheusReporter;
