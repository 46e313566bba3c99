//! HTTP handlers.

pub mod health;
pub mod output;
pub mod render;
