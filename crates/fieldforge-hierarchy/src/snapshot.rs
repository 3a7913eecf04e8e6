//! Snapshots of a hierarchy's build-relevant state.
//!
//! A snapshot is taken after every successful rebuild. Later edits are only
//! scheduled when a fresh snapshot differs from the cached one by more than
//! [`CACHE_PRECISION`](crate::CACHE_PRECISION).

use fieldforge_config::BoundsSettings;
use glam::DMat4;
use rustc_hash::FxHashMap;

use crate::approx::ApproxEq;
use crate::hierarchy::{Hierarchy, NodeKind};
use crate::id::NodeId;

/// Build-relevant state of one visible SDF node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot {
    pub world: DMat4,
    /// Link-resolved parameters.
    pub kind: NodeKind,
    /// A reparent changes the combine order.
    pub parent: Option<NodeId>,
    pub processing_order: i32,
}

/// State of one hierarchy captured at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchySnapshot {
    pub root: NodeId,
    pub settings: BoundsSettings,
    pub bounds_matrix: DMat4,
    pub nodes: FxHashMap<NodeId, NodeSnapshot>,
}

impl HierarchySnapshot {
    /// Captures the hierarchy under `root`. Returns `None` if `root` is not a
    /// live Bounds Controller.
    ///
    /// Hidden nodes are skipped along with everything below them. Containers
    /// are traversed but not recorded.
    pub fn capture(hierarchy: &Hierarchy, root: NodeId) -> Option<Self> {
        let settings = hierarchy.bounds_settings(root)?.clone();
        let mut nodes = FxHashMap::default();

        for id in hierarchy.visible_descendants(root) {
            let Some(node) = hierarchy.get(id) else {
                continue;
            };
            if !node.kind.is_sdf() {
                continue;
            }
            let Some(kind) = hierarchy.effective_kind(id) else {
                continue;
            };
            nodes.insert(
                id,
                NodeSnapshot {
                    world: hierarchy.world_transform(id),
                    kind: kind.clone(),
                    parent: node.parent(),
                    processing_order: node.processing_order,
                },
            );
        }

        Some(Self {
            root,
            settings,
            bounds_matrix: hierarchy.world_transform(root),
            nodes,
        })
    }

    /// Returns `true` if `current` differs from `cached`. A missing cache
    /// always counts as changed.
    pub fn has_changed(current: &Self, cached: Option<&Self>, tolerance: f64) -> bool {
        match cached {
            Some(cached) => !current.approx_eq(cached, tolerance),
            None => true,
        }
    }
}

impl ApproxEq for NodeKind {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (Self::Bounds(a), Self::Bounds(b)) => {
                a.result_name == b.result_name && a.settings.approx_eq(&b.settings, tolerance)
            }
            (Self::Source(a), Self::Source(b)) => a.approx_eq(b, tolerance),
            (Self::Group(a), Self::Group(b)) => a.approx_eq(b, tolerance),
            (Self::Canvas(a), Self::Canvas(b)) => a.approx_eq(b, tolerance),
            (Self::Container, Self::Container) => true,
            _ => false,
        }
    }
}

impl ApproxEq for NodeSnapshot {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.parent == other.parent
            && self.processing_order == other.processing_order
            && self.world.approx_eq(&other.world, tolerance)
            && self.kind.approx_eq(&other.kind, tolerance)
    }
}

impl ApproxEq for HierarchySnapshot {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.root == other.root
            && self.settings.approx_eq(&other.settings, tolerance)
            && self.bounds_matrix.approx_eq(&other.bounds_matrix, tolerance)
            && self.nodes.len() == other.nodes.len()
            && self.nodes.iter().all(|(id, node)| {
                other
                    .nodes
                    .get(id)
                    .is_some_and(|o| node.approx_eq(o, tolerance))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CACHE_PRECISION;
    use crate::params::{GroupParams, ShapeKind, SourceParams};
    use glam::DVec3;

    fn scene() -> (Hierarchy, NodeId, NodeId) {
        let mut h = Hierarchy::new();
        let root = h.add_bounds("Bounds", BoundsSettings::default());
        let cube = h
            .add_child(
                root,
                "Cube",
                NodeKind::Source(SourceParams::new(ShapeKind::Cube)),
            )
            .unwrap();
        (h, root, cube)
    }

    fn changed(h: &Hierarchy, root: NodeId, cached: &HierarchySnapshot) -> bool {
        let current = HierarchySnapshot::capture(h, root).unwrap();
        HierarchySnapshot::has_changed(&current, Some(cached), CACHE_PRECISION)
    }

    #[test]
    fn test_missing_cache_is_changed() {
        let (h, root, _) = scene();
        let current = HierarchySnapshot::capture(&h, root).unwrap();
        assert!(HierarchySnapshot::has_changed(&current, None, CACHE_PRECISION));
    }

    #[test]
    fn test_identical_capture_is_unchanged() {
        let (h, root, _) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();
        assert!(!changed(&h, root, &cached));
    }

    #[test]
    fn test_tiny_move_below_precision_is_unchanged() {
        let (mut h, root, cube) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();

        h.get_mut(cube).unwrap().local_transform =
            DMat4::from_translation(DVec3::new(1e-7, 0.0, 0.0));
        assert!(!changed(&h, root, &cached));

        h.get_mut(cube).unwrap().local_transform =
            DMat4::from_translation(DVec3::new(1e-3, 0.0, 0.0));
        assert!(changed(&h, root, &cached));
    }

    #[test]
    fn test_bounds_move_is_changed() {
        let (mut h, root, _) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();
        h.get_mut(root).unwrap().local_transform = DMat4::from_scale(DVec3::splat(2.0));
        assert!(changed(&h, root, &cached));
    }

    #[test]
    fn test_hiding_a_node_is_changed() {
        let (mut h, root, cube) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();
        h.get_mut(cube).unwrap().visible = false;
        assert!(changed(&h, root, &cached));
        assert!(HierarchySnapshot::capture(&h, root).unwrap().nodes.is_empty());
    }

    #[test]
    fn test_parameter_edit_is_changed() {
        let (mut h, root, cube) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();
        if let NodeKind::Source(p) = &mut h.get_mut(cube).unwrap().kind {
            p.shape = ShapeKind::Sphere;
        }
        assert!(changed(&h, root, &cached));
    }

    #[test]
    fn test_settings_edit_is_changed() {
        let (mut h, root, _) = scene();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();
        if let NodeKind::Bounds(b) = &mut h.get_mut(root).unwrap().kind {
            b.settings.global_blend_factor = 0.3;
        }
        assert!(changed(&h, root, &cached));
    }

    #[test]
    fn test_edit_on_link_target_propagates() {
        let (mut h, root, cube) = scene();
        let other_root = h.add_bounds("Other", BoundsSettings::default());
        let target = h
            .add_child(
                other_root,
                "Target",
                NodeKind::Source(SourceParams::new(ShapeKind::Cube)),
            )
            .unwrap();
        h.set_link(cube, Some(target)).unwrap();
        let cached = HierarchySnapshot::capture(&h, root).unwrap();

        if let NodeKind::Source(p) = &mut h.get_mut(target).unwrap().kind {
            p.shell = Some(0.05);
        }
        assert!(changed(&h, root, &cached));
    }

    #[test]
    fn test_containers_are_traversed_not_recorded() {
        let (mut h, root, _) = scene();
        let holder = h.add_child(root, "Empty", NodeKind::Container).unwrap();
        let group = h
            .add_child(holder, "Group", NodeKind::Group(GroupParams::default()))
            .unwrap();
        let snapshot = HierarchySnapshot::capture(&h, root).unwrap();
        assert!(!snapshot.nodes.contains_key(&holder));
        assert!(snapshot.nodes.contains_key(&group));
    }

    #[test]
    fn test_capture_requires_bounds() {
        let (h, _, cube) = scene();
        assert!(HierarchySnapshot::capture(&h, cube).is_none());
    }
}
