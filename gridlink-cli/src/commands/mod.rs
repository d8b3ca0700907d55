//! CLI Commands

pub mod config;
pub mod endpoints;
pub mod resolve;
pub mod rewrite;
