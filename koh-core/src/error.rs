//! Error types for the Koh runtime.
//!
//! User code (setup callbacks, watch handlers, updaters) reports failure by
//! panicking, and that panic travels to whoever triggered the run. The
//! variants here cover what the runtime itself refuses to do.

use crate::host::NodeId;
use crate::reactive::SubscriberId;

/// Errors raised by the reactive runtime and the host layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KohError {
    /// A subscriber tried to start a tracked run while already running.
    #[error("tracked evaluation of {0:?} re-entered itself")]
    ReentrantEvaluation(SubscriberId),

    /// Flushes kept scheduling further flushes past the configured limit.
    #[error("flush chain exceeded {limit} consecutive flushes (write cycle?)")]
    FlushDepthExceeded { limit: usize },

    /// One drain of the microtask queue ran more tasks than allowed.
    #[error("microtask drain exceeded {limit} tasks")]
    MicrotaskLimitExceeded { limit: usize },

    /// The insertion would make a node its own ancestor.
    #[error("cannot insert {child:?} under {parent:?}: hierarchy violation")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// No element carries the requested mount id.
    #[error("mount target '#{0}' not found")]
    MountTargetNotFound(String),

    /// Runtime configuration failed to parse or validate.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KohError>;
