//! # rdc-client
//!
//! Headless session client: loads TOML config, connects the UDP control
//! transport and runs a monitored [`rdc_core::PerformanceCoordinator`].
//! Also replays recorded network traces through the bitrate controller.

pub mod config;
pub mod replay;
pub mod transport;
