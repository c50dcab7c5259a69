//! Types shared by the dispatcher and the terminal client.

pub mod catalog;
pub mod config;
pub mod media;
pub mod platform;
pub mod query;
