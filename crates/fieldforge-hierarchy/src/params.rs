//! Per-node parameters for Source, Group, and Canvas nodes.
//!
//! Defaults mirror what a freshly added node carries in the host. Shapes are
//! unit-sized; scale and placement come from the node transform.

use glam::DVec2;

use crate::approx::ApproxEq;

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Primitive produced by a Source node.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Pyramid,
    Torus {
        /// Ring radius in unit space.
        major_radius: f64,
        /// Tube radius in unit space.
        minor_radius: f64,
    },
    RoundedBox {
        /// Corner rounding in unit space (`0.0..=0.5`).
        radius: f64,
    },
    Circle,
    Ring {
        /// Hole radius in unit space.
        inner_radius: f64,
    },
    Polygon {
        /// Number of sides (at least 3).
        sides: u32,
    },
    Text {
        text: String,
    },
    HalfSpace,
}

impl ShapeKind {
    /// Torus with the default radii.
    pub fn torus() -> Self {
        Self::Torus {
            major_radius: 0.35,
            minor_radius: 0.15,
        }
    }

    /// Rounded box with the default corner radius.
    pub fn rounded_box() -> Self {
        Self::RoundedBox { radius: 0.1 }
    }

    /// Ring with the default inner radius.
    pub fn ring() -> Self {
        Self::Ring { inner_radius: 0.25 }
    }

    /// Hexagon.
    pub fn polygon() -> Self {
        Self::Polygon { sides: 6 }
    }

    /// Stable lowercase identifier, matching the host's `sdf_type` values.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Cone => "cone",
            Self::Pyramid => "pyramid",
            Self::Torus { .. } => "torus",
            Self::RoundedBox { .. } => "rounded_box",
            Self::Circle => "circle",
            Self::Ring { .. } => "ring",
            Self::Polygon { .. } => "polygon",
            Self::Text { .. } => "text",
            Self::HalfSpace => "half_space",
        }
    }

    /// Returns `true` for shapes defined in the XY plane. Only these may
    /// appear inside a Canvas or be lofted.
    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            Self::Circle | Self::Ring { .. } | Self::Polygon { .. } | Self::Text { .. }
        )
    }
}

impl ApproxEq for ShapeKind {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (
                Self::Torus {
                    major_radius: a_major,
                    minor_radius: a_minor,
                },
                Self::Torus {
                    major_radius: b_major,
                    minor_radius: b_minor,
                },
            ) => a_major.approx_eq(b_major, tolerance) && a_minor.approx_eq(b_minor, tolerance),
            (Self::RoundedBox { radius: a }, Self::RoundedBox { radius: b }) => {
                a.approx_eq(b, tolerance)
            }
            (Self::Ring { inner_radius: a }, Self::Ring { inner_radius: b }) => {
                a.approx_eq(b, tolerance)
            }
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// How a node combines with the shape accumulated from its earlier siblings.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum InteractionMode {
    /// Union with the siblings.
    #[default]
    Normal,
    /// Subtracted from the siblings.
    Negative,
    /// Carves an offset gap around itself out of the siblings.
    Clearance { offset: f64, keep_original: bool },
    /// Interpolates between the siblings and itself.
    Morph { factor: f64 },
}

impl InteractionMode {
    /// Clearance with the default gap.
    pub fn clearance() -> Self {
        Self::Clearance {
            offset: 0.05,
            keep_original: true,
        }
    }

    /// Morph halfway.
    pub fn morph() -> Self {
        Self::Morph { factor: 0.5 }
    }
}

impl ApproxEq for InteractionMode {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (
                Self::Clearance {
                    offset: a,
                    keep_original: a_keep,
                },
                Self::Clearance {
                    offset: b,
                    keep_original: b_keep,
                },
            ) => a_keep == b_keep && a.approx_eq(b, tolerance),
            (Self::Morph { factor: a }, Self::Morph { factor: b }) => a.approx_eq(b, tolerance),
            _ => self == other,
        }
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Principal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

/// Per-axis on/off switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    /// All three axes enabled.
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };

    /// Returns `true` when no axis is enabled.
    pub fn is_empty(&self) -> bool {
        !(self.x || self.y || self.z)
    }
}

/// Repetition along one axis of a linear array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearAxis {
    /// Number of copies including the original.
    pub count: u32,
    /// Spacing between copies.
    pub delta: f64,
}

impl Default for LinearAxis {
    fn default() -> Self {
        Self {
            count: 2,
            delta: 1.0,
        }
    }
}

impl ApproxEq for LinearAxis {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.count == other.count && self.delta.approx_eq(&other.delta, tolerance)
    }
}

/// Repetition modifier shared by Sources and Groups.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ArrayMode {
    #[default]
    None,
    Linear {
        x: Option<LinearAxis>,
        y: Option<LinearAxis>,
        z: Option<LinearAxis>,
    },
    Radial {
        count: u32,
        center: DVec2,
        center_on_origin: bool,
    },
}

impl ArrayMode {
    /// Six copies around the origin.
    pub fn radial() -> Self {
        Self::Radial {
            count: 6,
            center: DVec2::ZERO,
            center_on_origin: true,
        }
    }
}

impl ApproxEq for ArrayMode {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (
                Self::Linear {
                    x: ax,
                    y: ay,
                    z: az,
                },
                Self::Linear {
                    x: bx,
                    y: by,
                    z: bz,
                },
            ) => {
                ax.approx_eq(bx, tolerance)
                    && ay.approx_eq(by, tolerance)
                    && az.approx_eq(bz, tolerance)
            }
            (
                Self::Radial {
                    count: a_count,
                    center: a_center,
                    center_on_origin: a_origin,
                },
                Self::Radial {
                    count: b_count,
                    center: b_center,
                    center_on_origin: b_origin,
                },
            ) => {
                a_count == b_count
                    && a_origin == b_origin
                    && a_center.approx_eq(b_center, tolerance)
            }
            _ => false,
        }
    }
}

/// Scales XY linearly along Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Taper {
    pub factor: f64,
    pub height: f64,
    pub base_scale: f64,
}

impl Default for Taper {
    fn default() -> Self {
        Self {
            factor: 0.5,
            height: 1.0,
            base_scale: 1.0,
        }
    }
}

/// Offsets X proportionally to Y.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shear {
    pub offset: f64,
    pub base_offset: f64,
    pub height: f64,
}

impl Default for Shear {
    fn default() -> Self {
        Self {
            offset: 0.5,
            base_offset: 0.0,
            height: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttractRepelMode {
    Attract,
    Repel,
}

/// Pulls space toward (or pushes it away from) the group origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttractRepel {
    pub mode: AttractRepelMode,
    pub radius: f64,
    pub exaggerate: f64,
    pub axes: AxisMask,
}

impl AttractRepel {
    pub fn new(mode: AttractRepelMode) -> Self {
        Self {
            mode,
            radius: 0.5,
            exaggerate: 1.0,
            axes: AxisMask::ALL,
        }
    }
}

/// Rotates space around an axis by an amount falling off with radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Twirl {
    pub axis: Axis,
    pub amount: f64,
    pub radius: f64,
}

impl Default for Twirl {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            amount: std::f64::consts::FRAC_PI_2,
            radius: 1.0,
        }
    }
}

impl ApproxEq for Taper {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.factor.approx_eq(&other.factor, tolerance)
            && self.height.approx_eq(&other.height, tolerance)
            && self.base_scale.approx_eq(&other.base_scale, tolerance)
    }
}

impl ApproxEq for Shear {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.offset.approx_eq(&other.offset, tolerance)
            && self.base_offset.approx_eq(&other.base_offset, tolerance)
            && self.height.approx_eq(&other.height, tolerance)
    }
}

impl ApproxEq for AttractRepel {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.mode == other.mode
            && self.axes == other.axes
            && self.radius.approx_eq(&other.radius, tolerance)
            && self.exaggerate.approx_eq(&other.exaggerate, tolerance)
    }
}

impl ApproxEq for Twirl {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.axis == other.axis
            && self.amount.approx_eq(&other.amount, tolerance)
            && self.radius.approx_eq(&other.radius, tolerance)
    }
}

// ---------------------------------------------------------------------------
// Node parameter sets
// ---------------------------------------------------------------------------

/// Parameters of a shape-producing node.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceParams {
    pub shape: ShapeKind,
    pub mode: InteractionMode,
    /// Blend applied between this node's children.
    pub child_blend_factor: f64,
    /// Hollow the shape to a shell of this thickness.
    pub shell: Option<f64>,
    /// Loft between this planar shape and its planar child.
    pub loft: bool,
    pub array: ArrayMode,
}

impl SourceParams {
    /// Default parameters for the given shape.
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            mode: InteractionMode::Normal,
            child_blend_factor: 0.0,
            shell: None,
            loft: false,
            array: ArrayMode::None,
        }
    }
}

impl ApproxEq for SourceParams {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.loft == other.loft
            && self.shape.approx_eq(&other.shape, tolerance)
            && self.mode.approx_eq(&other.mode, tolerance)
            && self
                .child_blend_factor
                .approx_eq(&other.child_blend_factor, tolerance)
            && self.shell.approx_eq(&other.shell, tolerance)
            && self.array.approx_eq(&other.array, tolerance)
    }
}

/// Parameters of a container that modifies its children as a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupParams {
    pub mode: InteractionMode,
    pub child_blend_factor: f64,
    pub symmetry: AxisMask,
    pub taper: Option<Taper>,
    pub shear: Option<Shear>,
    pub attract_repel: Option<AttractRepel>,
    pub twirl: Option<Twirl>,
    pub array: ArrayMode,
}

impl Default for GroupParams {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Normal,
            child_blend_factor: 0.1,
            symmetry: AxisMask::default(),
            taper: None,
            shear: None,
            attract_repel: None,
            twirl: None,
            array: ArrayMode::None,
        }
    }
}

impl ApproxEq for GroupParams {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.symmetry == other.symmetry
            && self.mode.approx_eq(&other.mode, tolerance)
            && self
                .child_blend_factor
                .approx_eq(&other.child_blend_factor, tolerance)
            && self.taper.approx_eq(&other.taper, tolerance)
            && self.shear.approx_eq(&other.shear, tolerance)
            && self.attract_repel.approx_eq(&other.attract_repel, tolerance)
            && self.twirl.approx_eq(&other.twirl, tolerance)
            && self.array.approx_eq(&other.array, tolerance)
    }
}

/// Parameters of a 2D subtree lifted into 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasParams {
    pub mode: InteractionMode,
    pub child_blend_factor: f64,
    /// Extrusion depth when not revolving.
    pub extrusion_depth: f64,
    /// Revolve around the canvas Y axis instead of extruding.
    pub revolve: bool,
}

impl Default for CanvasParams {
    fn default() -> Self {
        Self {
            mode: InteractionMode::Normal,
            child_blend_factor: 0.0,
            extrusion_depth: 0.1,
            revolve: false,
        }
    }
}

impl ApproxEq for CanvasParams {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.revolve == other.revolve
            && self.mode.approx_eq(&other.mode, tolerance)
            && self
                .child_blend_factor
                .approx_eq(&other.child_blend_factor, tolerance)
            && self
                .extrusion_depth
                .approx_eq(&other.extrusion_depth, tolerance)
    }
}
