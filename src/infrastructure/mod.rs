//! Infrastructure: configuration loading and logging setup.

pub mod config;
