//! Report rendering.

pub mod generator;

pub use generator::{render_citizen_listing, render_report, ReportOptions};
