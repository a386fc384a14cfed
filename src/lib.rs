//! Opusrack - multi-bitrate opus encoding service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod accounts;
pub mod config;
pub mod convert;
pub mod server;
pub mod storage;
