//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the observatory core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the domain crates depend
//! on. It establishes the logging conventions, the configuration contract
//! between hosts and the core, and the event broadcasting mechanism used to
//! surface authorization state changes to presentation layers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
