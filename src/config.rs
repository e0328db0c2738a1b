//! Configuration for the document workspace.

use std::time::Duration;

/// Workspace configuration.
///
/// Limits are enforced at the store boundary; the values here are policy,
/// the enforcement is not optional.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Maximum accepted document size in bytes (upload and replace).
    pub max_file_size: usize,

    /// Number of loaded document models kept in the arena before LRU
    /// eviction kicks in.
    pub arena_capacity: usize,

    /// Time budget for auxiliary CPU-bound work (OCR, conversion).
    pub auxiliary_timeout: Duration,

    /// Upper bound for the page render zoom factor.
    pub max_zoom: f32,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_file_size: 16 * 1024 * 1024,
            arena_capacity: 16,
            auxiliary_timeout: Duration::from_secs(30),
            max_zoom: 8.0,
        }
    }

    /// Set the maximum accepted document size in bytes.
    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the arena capacity.
    pub fn with_arena_capacity(mut self, capacity: usize) -> Self {
        self.arena_capacity = capacity.max(1);
        self
    }

    /// Set the auxiliary work time budget.
    pub fn with_auxiliary_timeout(mut self, timeout: Duration) -> Self {
        self.auxiliary_timeout = timeout;
        self
    }

    /// Set the maximum render zoom factor.
    pub fn with_max_zoom(mut self, zoom: f32) -> Self {
        self.max_zoom = zoom;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkspaceConfig::new();
        assert_eq!(config.max_file_size, 16 * 1024 * 1024);
        assert_eq!(config.arena_capacity, 16);
        assert_eq!(config.max_zoom, 8.0);
    }

    #[test]
    fn test_builders() {
        let config = WorkspaceConfig::new()
            .with_max_file_size(1024)
            .with_arena_capacity(4)
            .with_auxiliary_timeout(Duration::from_secs(5))
            .with_max_zoom(2.0);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.arena_capacity, 4);
        assert_eq!(config.auxiliary_timeout, Duration::from_secs(5));
        assert_eq!(config.max_zoom, 2.0);
    }

    #[test]
    fn test_arena_capacity_floor() {
        let config = WorkspaceConfig::new().with_arena_capacity(0);
        assert_eq!(config.arena_capacity, 1);
    }
}
