//! Infrastructure layer module
//!
//! This module contains the collaborators around the reduction engine:
//! - Content loading from disk
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod content;
pub mod logging;
