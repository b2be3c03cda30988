//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - HTTP clients (default and no-redirect variants)
//! - DNS resolver
//! - Concurrency semaphore
//! - Logger

mod client;
mod logger;
mod resolver;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use client::{init_client, init_redirect_client};
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes a semaphore for controlling concurrency.
///
/// This semaphore is the pipeline's sole admission-control point: it bounds
/// the number of concurrently executing scans.
///
/// # Arguments
///
/// * `count` - Maximum number of concurrent scans allowed
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
