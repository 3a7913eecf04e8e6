//! One rebuild of one hierarchy root, from expression to published mesh.

use fieldforge_hierarchy::{Hierarchy, NodeId};
use fieldforge_mesh::{MeshData, MeshRegion};
use tracing::info;

use crate::error::{BoxError, RebuildError};
use crate::scheduler::RebuildRequest;

/// Lowest resolution handed to the mesher.
pub const MIN_RESOLUTION: u32 = 3;

/// Turns a hierarchy into an expression the mesher understands.
pub trait ExpressionBuilder {
    type Expr;

    fn build_expression(
        &mut self,
        hierarchy: &Hierarchy,
        root: NodeId,
    ) -> Result<Self::Expr, BoxError>;
}

/// Samples an expression over a region at a given resolution.
pub trait Mesher<E> {
    fn mesh(
        &mut self,
        expr: &E,
        resolution: u32,
        region: &MeshRegion,
    ) -> Result<MeshData, BoxError>;
}

/// A finished mesh on its way to the host scene.
#[derive(Clone, Copy, Debug)]
pub struct Publish<'a> {
    pub root: NodeId,
    /// Name of the result object; created by the binder when missing.
    pub name: &'a str,
    pub mesh: &'a MeshData,
    pub smooth_shade: bool,
}

/// Publishes meshes into host result objects.
pub trait ResultBinder {
    /// Returns `true` if an object called `name` exists in the host scene.
    fn exists(&self, name: &str) -> bool;

    fn write_mesh(&mut self, publish: Publish<'_>) -> Result<(), BoxError>;
}

/// Drives the collaborators for one dispatched rebuild.
#[derive(Debug)]
pub struct RebuildPipeline<B, M, R> {
    builder: B,
    mesher: M,
    binder: R,
}

impl<B, M, R> RebuildPipeline<B, M, R>
where
    B: ExpressionBuilder,
    M: Mesher<B::Expr>,
    R: ResultBinder,
{
    pub fn new(builder: B, mesher: M, binder: R) -> Self {
        Self {
            builder,
            mesher,
            binder,
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn mesher(&self) -> &M {
        &self.mesher
    }

    pub fn mesher_mut(&mut self) -> &mut M {
        &mut self.mesher
    }

    pub fn binder(&self) -> &R {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut R {
        &mut self.binder
    }

    /// Builds, meshes and publishes `request.root`, returning the mesh.
    ///
    /// A root without a result object gets a generated one when its
    /// settings allow it; the new name is stored on the root. When creation
    /// is disabled an empty mesh is accepted silently and a non-empty one is
    /// an [`RebuildError::Io`]. On any error nothing is published.
    pub fn run(
        &mut self,
        hierarchy: &mut Hierarchy,
        request: &RebuildRequest,
    ) -> Result<MeshData, RebuildError> {
        let root = request.root;
        let settings = hierarchy
            .bounds_settings(root)
            .cloned()
            .ok_or_else(|| RebuildError::Build {
                root,
                source: "not a bounds controller".into(),
            })?;

        let expr = self
            .builder
            .build_expression(hierarchy, root)
            .map_err(|source| RebuildError::Build { root, source })?;

        let region = MeshRegion::from_bounds_matrix(&hierarchy.world_transform(root));
        let resolution = request.resolution.max(MIN_RESOLUTION);
        let mesh = self
            .mesher
            .mesh(&expr, resolution, &region)
            .map_err(|source| RebuildError::Mesh { root, source })?;

        let Some(name) = self.resolve_result_name(hierarchy, root, settings.create_result_object)?
        else {
            if mesh.is_empty() {
                return Ok(mesh);
            }
            return Err(RebuildError::Io {
                root,
                source: "mesh generated but no result object is bound and creation is disabled"
                    .into(),
            });
        };

        self.binder
            .write_mesh(Publish {
                root,
                name: &name,
                mesh: &mesh,
                smooth_shade: settings.result_smooth_shade,
            })
            .map_err(|source| RebuildError::Io { root, source })?;

        info!(
            "Rebuilt {} ({:?}, resolution {}): {} vertices, {} faces",
            name,
            request.kind,
            resolution,
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(mesh)
    }

    fn resolve_result_name(
        &self,
        hierarchy: &mut Hierarchy,
        root: NodeId,
        create: bool,
    ) -> Result<Option<String>, RebuildError> {
        let bound = hierarchy.result_name(root).map(str::to_owned);
        match bound {
            Some(name) if create || self.binder.exists(&name) => Ok(Some(name)),
            Some(_) => Ok(None),
            None if create => {
                let bounds_name = hierarchy
                    .node(root)
                    .map(|n| n.name.clone())
                    .map_err(|e| RebuildError::Io {
                        root,
                        source: Box::new(e),
                    })?;
                let name = generate_result_name(&bounds_name, |candidate| {
                    self.binder.exists(candidate)
                });
                hierarchy
                    .set_result_name(root, Some(name.clone()))
                    .map_err(|e| RebuildError::Io {
                        root,
                        source: Box::new(e),
                    })?;
                info!("Generated result object name '{name}' for {bounds_name}");
                Ok(Some(name))
            }
            None => Ok(None),
        }
    }
}

/// Derives a free result object name from a bounds name.
///
/// `Scene_Bounds` becomes `Scene_Result`, then `Scene_Result.001`,
/// `Scene_Result.002` and so on while `taken` reports a clash.
pub fn generate_result_name(bounds_name: &str, taken: impl Fn(&str) -> bool) -> String {
    let stem = bounds_name.replace("_Bounds", "");
    let stem = if stem.is_empty() { "SDF_System" } else { &stem };
    let base = format!("{stem}_Result");

    let mut candidate = base.clone();
    let mut suffix = 1_u32;
    while taken(&candidate) {
        candidate = format!("{base}.{suffix:03}");
        suffix += 1;
    }
    candidate
}
