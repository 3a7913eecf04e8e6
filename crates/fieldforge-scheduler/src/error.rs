//! Error types for scheduling and rebuilds.

use fieldforge_hierarchy::NodeId;
use thiserror::Error;

/// Error type returned by the external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Misuse of the scheduler API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("root {0} is not registered")]
    UnknownRoot(NodeId),
    #[error("root {0} has no rebuild in flight")]
    NotRebuilding(NodeId),
    #[error("node {0} is not a bounds controller")]
    NotBounds(NodeId),
}

/// Failure of one rebuild. The root stays dirty and the result object keeps
/// its last good mesh.
#[derive(Debug, Error)]
pub enum RebuildError {
    /// The hierarchy could not be turned into an expression.
    #[error("failed to build expression for {root}: {source}")]
    Build {
        root: NodeId,
        #[source]
        source: BoxError,
    },
    /// The mesher rejected the expression or timed out.
    #[error("meshing failed for {root}: {source}")]
    Mesh {
        root: NodeId,
        #[source]
        source: BoxError,
    },
    /// The mesh could not be published to the result object.
    #[error("failed to publish mesh for {root}: {source}")]
    Io {
        root: NodeId,
        #[source]
        source: BoxError,
    },
}

impl RebuildError {
    pub fn root(&self) -> NodeId {
        match self {
            Self::Build { root, .. } | Self::Mesh { root, .. } | Self::Io { root, .. } => *root,
        }
    }
}
