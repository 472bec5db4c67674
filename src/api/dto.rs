//! Data Transfer Objects
//!
//! Response types for the API endpoints.

use serde::Serialize;

/// Diagnostic snapshot of the relay
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Registered device connections
    pub devices: usize,
    /// Registered controller connections
    pub controllers: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
