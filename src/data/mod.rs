//! Data models for extracted measurements.
//!
//! ## Data flow
//!
//! ```text
//! raw log blob (source::read_log)
//!        │
//!        ▼
//! serde_json::Value, one per run
//!        │
//!        ▼
//! sample::extract_performance()
//!        │
//!        └──▶ PerfSample (timestamp, send rate, receive rate, label)
//! ```

pub mod sample;

pub use sample::{extract_performance, PerfSample};
