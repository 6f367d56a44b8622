//! HTTP handlers

pub mod health;
pub mod metrics;
pub mod train;
pub mod detect;
pub mod status;
pub mod model;
