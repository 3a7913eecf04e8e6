//! SDF hierarchy model: an arena of Bounds, Source, Group, and Canvas nodes
//! referenced by stable [`NodeId`] handles, plus snapshot-based change
//! detection.

pub mod approx;
pub mod hierarchy;
pub mod id;
pub mod params;
pub mod snapshot;

pub use approx::{ApproxEq, CACHE_PRECISION};
pub use hierarchy::{BoundsNode, Hierarchy, HierarchyError, Node, NodeKind};
pub use id::NodeId;
pub use params::{
    ArrayMode, AttractRepel, AttractRepelMode, Axis, AxisMask, CanvasParams, GroupParams,
    InteractionMode, LinearAxis, Shear, ShapeKind, SourceParams, Taper, Twirl,
};
pub use snapshot::{HierarchySnapshot, NodeSnapshot};
