//! Arena-backed SDF hierarchy.
//!
//! Every node lives in a slot of one [`Hierarchy`] and is referenced by a
//! [`NodeId`]. Parents hold their children as id lists, so no node owns
//! another and the structure can never form a reference cycle. The tree
//! invariant (one parent chain per node, ending at a Bounds Controller) is
//! enforced on insertion and reparenting.

use fieldforge_config::BoundsSettings;
use glam::DMat4;
use thiserror::Error;
use tracing::debug;

use crate::id::NodeId;
use crate::params::{CanvasParams, GroupParams, SourceParams};

/// Settings and result binding owned by a hierarchy root.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundsNode {
    pub settings: BoundsSettings,
    /// Name of the host object that receives the generated mesh.
    pub result_name: Option<String>,
}

/// What a node is.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Hierarchy root.
    Bounds(BoundsNode),
    Source(SourceParams),
    Group(GroupParams),
    Canvas(CanvasParams),
    /// Non-SDF host object. Contributes nothing and passes its children through.
    Container,
}

impl NodeKind {
    /// Returns `true` for Source, Group, and Canvas nodes.
    pub fn is_sdf(&self) -> bool {
        matches!(self, Self::Source(_) | Self::Group(_) | Self::Canvas(_))
    }

    /// Blend factor this node applies between its own children, if it has one.
    pub fn child_blend_factor(&self) -> Option<f64> {
        match self {
            Self::Source(p) => Some(p.child_blend_factor),
            Self::Group(p) => Some(p.child_blend_factor),
            Self::Canvas(p) => Some(p.child_blend_factor),
            Self::Bounds(b) => Some(b.settings.global_blend_factor),
            Self::Container => None,
        }
    }

    /// Two kinds may be linked when they are the same variant.
    fn is_link_compatible(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Bounds(_) => "bounds",
            Self::Source(_) => "source",
            Self::Group(_) => "group",
            Self::Canvas(_) => "canvas",
            Self::Container => "container",
        }
    }
}

/// One node of the hierarchy.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Transform relative to the parent.
    pub local_transform: DMat4,
    /// Hidden nodes and everything below them are left out of the build.
    pub visible: bool,
    /// Sort key among siblings; lower is processed first.
    pub processing_order: i32,
    /// Parameters are read from this node instead, when compatible.
    pub link: Option<NodeId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: String, kind: NodeKind, parent: Option<NodeId>, processing_order: i32) -> Self {
        Self {
            name,
            kind,
            local_transform: DMat4::IDENTITY,
            visible: true,
            processing_order,
            link: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order. See [`Hierarchy::ordered_children`] for
    /// processing order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Errors from structural edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("a bounds controller cannot have a parent")]
    BoundsHasNoParent,
    #[error("node {node} cannot be placed under {parent}: it would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },
    #[error("only planar sources and groups may be placed inside canvas {canvas}")]
    NotPlanar { canvas: NodeId },
    #[error("node {0} is not a bounds controller")]
    NotBounds(NodeId),
    #[error("cannot link {node} to {target}: {reason}")]
    InvalidLink {
        node: NodeId,
        target: NodeId,
        reason: &'static str,
    },
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of SDF nodes forming one or more trees, each rooted at a Bounds
/// Controller.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Insertion
    // -----------------------------------------------------------------------

    /// Adds a new hierarchy root.
    pub fn add_bounds(&mut self, name: impl Into<String>, settings: BoundsSettings) -> NodeId {
        let kind = NodeKind::Bounds(BoundsNode {
            settings,
            result_name: None,
        });
        self.insert(Node::new(name.into(), kind, None, 0))
    }

    /// Adds `kind` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Fails if the parent is unknown, if `kind` is a Bounds Controller, or if
    /// the parent lies inside a Canvas and `kind` is not planar.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId, HierarchyError> {
        if matches!(kind, NodeKind::Bounds(_)) {
            return Err(HierarchyError::BoundsHasNoParent);
        }
        let siblings = self.node(parent)?.children.len();
        if let Some(canvas) = self.enclosing_canvas(parent) {
            check_planar(&kind, canvas)?;
        }

        let order = i32::try_from(siblings).unwrap_or(i32::MAX / 10) * 10;
        let id = self.insert(Node::new(name.into(), kind, Some(parent), order));
        if let Some(p) = self.get_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Returns the node for `id`, or `None` if it was removed.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Like [`get`](Self::get) but with an error for unknown ids.
    pub fn node(&self, id: NodeId) -> Result<&Node, HierarchyError> {
        self.get(id).ok_or(HierarchyError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All Bounds Controllers.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let node = slot.node.as_ref()?;
            matches!(node.kind, NodeKind::Bounds(_))
                .then(|| NodeId::new(index as u32, slot.generation))
        })
    }

    /// Walks up from `id` to its Bounds Controller.
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.get(current)?;
            match (&node.kind, node.parent) {
                (NodeKind::Bounds(_), _) => return Some(current),
                (_, Some(parent)) => current = parent,
                (_, None) => return None,
            }
        }
    }

    /// Returns `true` if `ancestor` lies on the parent chain of `id`
    /// (`id` itself included).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.get(node_id).and_then(|n| n.parent);
        }
        false
    }

    /// Children of `id` sorted by processing order, then name.
    pub fn ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|c| self.contains(*c))
            .collect();
        children.sort_by(|a, b| match (self.get(*a), self.get(*b)) {
            (Some(na), Some(nb)) => na
                .processing_order
                .cmp(&nb.processing_order)
                .then_with(|| na.name.cmp(&nb.name)),
            _ => std::cmp::Ordering::Equal,
        });
        children
    }

    /// Visible descendants of `id` in depth-first processing order. Hidden
    /// nodes are skipped together with their subtrees.
    pub fn visible_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.ordered_children(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            out.push(current);
            stack.extend(self.ordered_children(current).into_iter().rev());
        }
        out
    }

    /// World transform: the product of local transforms from the root down.
    pub fn world_transform(&self, id: NodeId) -> DMat4 {
        let mut transform = DMat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get(node_id) else {
                break;
            };
            transform = node.local_transform * transform;
            current = node.parent;
        }
        transform
    }

    // -----------------------------------------------------------------------
    // Links and effective parameters
    // -----------------------------------------------------------------------

    /// Links `id`'s parameters to `target`.
    ///
    /// # Errors
    ///
    /// Fails for unknown nodes, self links, and targets of a different kind.
    pub fn set_link(&mut self, id: NodeId, target: Option<NodeId>) -> Result<(), HierarchyError> {
        if let Some(target) = target {
            if target == id {
                return Err(HierarchyError::InvalidLink {
                    node: id,
                    target,
                    reason: "a node cannot link to itself",
                });
            }
            let target_kind = &self.node(target)?.kind;
            if !self.node(id)?.kind.is_link_compatible(target_kind) {
                return Err(HierarchyError::InvalidLink {
                    node: id,
                    target,
                    reason: "kinds differ",
                });
            }
        }
        self.get_mut(id).ok_or(HierarchyError::UnknownNode(id))?.link = target;
        Ok(())
    }

    /// Node whose parameters apply to `id`: its link target when the target
    /// still exists and has the same kind, otherwise `id` itself.
    pub fn effective(&self, id: NodeId) -> NodeId {
        let Some(node) = self.get(id) else {
            return id;
        };
        match node.link.and_then(|t| self.get(t).map(|n| (t, n))) {
            Some((target, target_node)) if node.kind.is_link_compatible(&target_node.kind) => {
                target
            }
            _ => id,
        }
    }

    /// Link-resolved parameters of `id`.
    pub fn effective_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(self.effective(id)).map(|n| &n.kind)
    }

    /// Link-resolved settings of a Bounds Controller.
    pub fn bounds_settings(&self, root: NodeId) -> Option<&BoundsSettings> {
        match self.effective_kind(root)? {
            NodeKind::Bounds(b) => Some(&b.settings),
            _ => None,
        }
    }

    /// Blend factor that combines `id` with its siblings.
    ///
    /// Determined by the nearest SDF ancestor's child blend factor, or the
    /// root's global blend factor for top-level nodes. Containers are
    /// transparent.
    pub fn effective_blend(&self, id: NodeId) -> Option<f64> {
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            let parent_node = self.get(parent)?;
            if let Some(blend) = self.effective_kind(parent)?.child_blend_factor() {
                return Some(blend);
            }
            current = parent_node.parent;
        }
        None
    }

    // -----------------------------------------------------------------------
    // Result binding
    // -----------------------------------------------------------------------

    pub fn result_name(&self, root: NodeId) -> Option<&str> {
        match &self.get(root)?.kind {
            NodeKind::Bounds(b) => b.result_name.as_deref(),
            _ => None,
        }
    }

    /// Binds `root` to the named result object.
    pub fn set_result_name(
        &mut self,
        root: NodeId,
        name: Option<String>,
    ) -> Result<(), HierarchyError> {
        match &mut self.get_mut(root).ok_or(HierarchyError::UnknownNode(root))?.kind {
            NodeKind::Bounds(b) => {
                b.result_name = name;
                Ok(())
            }
            _ => Err(HierarchyError::NotBounds(root)),
        }
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Moves `id` (with its subtree) under `new_parent`, appending it last.
    ///
    /// # Errors
    ///
    /// Rejects moving a Bounds Controller, moving a node under itself or one
    /// of its descendants, and moving non-planar content into a Canvas.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), HierarchyError> {
        let node = self.node(id)?;
        if matches!(node.kind, NodeKind::Bounds(_)) {
            return Err(HierarchyError::BoundsHasNoParent);
        }
        self.node(new_parent)?;
        if self.is_ancestor(id, new_parent) {
            return Err(HierarchyError::Cycle {
                node: id,
                parent: new_parent,
            });
        }
        if let Some(canvas) = self.enclosing_canvas(new_parent) {
            check_planar(&node.kind, canvas)?;
            for descendant in self.all_descendants(id) {
                check_planar(&self.node(descendant)?.kind, canvas)?;
            }
        }

        let old_parent = node.parent;
        if let Some(old) = old_parent.and_then(|p| self.get_mut(p)) {
            old.children.retain(|c| *c != id);
        }
        let siblings = self.node(new_parent)?.children.len();
        if let Some(parent) = self.get_mut(new_parent) {
            parent.children.push(id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = Some(new_parent);
            node.processing_order = i32::try_from(siblings).unwrap_or(i32::MAX / 10) * 10;
        }
        debug!("Reparented {id} under {new_parent}");
        Ok(())
    }

    /// Removes `id` and its whole subtree. Returns the removed ids, `id` first.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, HierarchyError> {
        let parent = self.node(id)?.parent;
        if let Some(p) = parent.and_then(|p| self.get_mut(p)) {
            p.children.retain(|c| *c != id);
        }

        let mut removed = vec![id];
        removed.extend(self.all_descendants(id));
        for node_id in &removed {
            let slot = &mut self.slots[node_id.index() as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index());
        }
        debug!("Removed {} node(s) starting at {id}", removed.len());
        Ok(removed)
    }

    /// Reassigns processing orders of `parent`'s children to `0, 10, 20, ...`
    /// following their current order.
    pub fn normalize_order(&mut self, parent: NodeId) {
        for (i, child) in self.ordered_children(parent).into_iter().enumerate() {
            if let Some(node) = self.get_mut(child) {
                node.processing_order = i32::try_from(i * 10).unwrap_or(i32::MAX);
            }
        }
    }

    fn all_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.get(id).map(|n| n.children.clone()).unwrap_or_default();
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }

    /// Nearest Canvas on the chain from `id` (inclusive) up to the root.
    fn enclosing_canvas(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if matches!(node.kind, NodeKind::Canvas(_)) {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }
}

fn check_planar(kind: &NodeKind, canvas: NodeId) -> Result<(), HierarchyError> {
    let allowed = match kind {
        NodeKind::Source(p) => p.shape.is_planar(),
        NodeKind::Group(_) | NodeKind::Container => true,
        NodeKind::Canvas(_) | NodeKind::Bounds(_) => false,
    };
    if allowed {
        Ok(())
    } else {
        debug!("Rejected {} inside canvas {canvas}", kind.label());
        Err(HierarchyError::NotPlanar { canvas })
    }
}
