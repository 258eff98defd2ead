//! Event channel client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChannelClient`] | Connection owner, subscriptions, reconnection |
//! | [`ChannelClientBuilder`] | Fluent configuration builder |
//! | [`ReconnectPolicy`] | Exponential backoff settings |
//! | [`ConnectionInfo`] | Connection state snapshot |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Reconnection policy.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ChannelClientBuilder, DEFAULT_URL};
pub use core::{ChannelClient, ConnectionInfo, REASON_CLIENT_DISCONNECT};
pub use options::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ReconnectPolicy};
