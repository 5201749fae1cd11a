pub mod aggregation;
pub mod handler;
pub mod models;
pub mod service;

pub use service::{ReportError, ReportService};
