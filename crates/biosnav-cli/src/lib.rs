//! biosnav command line library.
//!
//! Configuration, logging setup and the end-to-end boot flow. Separated from
//! main.rs to enable integration testing.

pub mod config;
pub mod flow;
pub mod logging;
