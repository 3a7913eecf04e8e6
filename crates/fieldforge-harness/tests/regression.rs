//! End-to-end regression tests: hierarchies are rebuilt through the update
//! driver with a deterministic mesher, exported to OBJ, and checked by the
//! suite.

use std::fs;
use std::path::{Path, PathBuf};

use fieldforge_config::BoundsSettings;
use fieldforge_harness::{
    BoxError, CaseFailure, CaseRunner, ExistingOutputs, GROUND_TRUTH_SUFFIX, Suite, TestCase,
    accept, accept_all,
};
use fieldforge_hierarchy::{GroupParams, Hierarchy, NodeId, NodeKind, ShapeKind, SourceParams};
use fieldforge_mesh::{
    DEFAULT_TOLERANCE, MeshData, MeshRegion, compare_meshes, read_obj, write_obj,
};
use fieldforge_scheduler::{
    ExpressionBuilder, Mesher, Publish, RebuildPipeline, ResultBinder, UpdateDriver,
};
use glam::{DMat4, DVec3};

// ---------------------------------------------------------------------------
// Deterministic collaborators
// ---------------------------------------------------------------------------

/// Expression: world-space centres of every visible source.
struct Centres;

impl ExpressionBuilder for Centres {
    type Expr = Vec<DVec3>;

    fn build_expression(
        &mut self,
        hierarchy: &Hierarchy,
        root: NodeId,
    ) -> Result<Vec<DVec3>, BoxError> {
        Ok(hierarchy
            .visible_descendants(root)
            .into_iter()
            .filter(|id| matches!(hierarchy.effective_kind(*id), Some(NodeKind::Source(_))))
            .map(|id| hierarchy.world_transform(id).transform_point3(DVec3::ZERO))
            .collect())
    }
}

const QUADS: [[u32; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

/// Emits an axis-aligned cube per centre whose size shrinks with resolution.
struct CubeMesher;

impl Mesher<Vec<DVec3>> for CubeMesher {
    fn mesh(
        &mut self,
        centres: &Vec<DVec3>,
        resolution: u32,
        region: &MeshRegion,
    ) -> Result<MeshData, BoxError> {
        let half = region.size().min_element() / f64::from(resolution);
        let mut mesh = MeshData::default();
        for centre in centres {
            let base = mesh.vertices.len() as u32;
            for i in 0..8 {
                let corner = DVec3::new(
                    if i & 1 == 0 { -half } else { half },
                    if i & 2 == 0 { -half } else { half },
                    if i & 4 == 0 { -half } else { half },
                );
                mesh.vertices.push(*centre + corner);
            }
            for [a, b, c, d] in QUADS {
                mesh.faces.push(vec![base + a, base + b, base + c]);
                mesh.faces.push(vec![base + a, base + c, base + d]);
            }
        }
        Ok(mesh)
    }
}

/// Writes each published mesh to `<dir>/<name>.obj`.
struct ObjExport {
    dir: PathBuf,
}

impl ResultBinder for ObjExport {
    fn exists(&self, name: &str) -> bool {
        self.dir.join(format!("{name}.obj")).exists()
    }

    fn write_mesh(&mut self, publish: Publish<'_>) -> Result<(), BoxError> {
        write_obj(&self.dir.join(format!("{}.obj", publish.name)), publish.mesh)?;
        Ok(())
    }
}

type Driver = UpdateDriver<Centres, CubeMesher, ObjExport>;

fn driver(dir: &Path) -> Driver {
    UpdateDriver::new(RebuildPipeline::new(
        Centres,
        CubeMesher,
        ObjExport {
            dir: dir.to_path_buf(),
        },
    ))
}

// ---------------------------------------------------------------------------
// Fixed test hierarchies
// ---------------------------------------------------------------------------

fn source(shape: ShapeKind) -> NodeKind {
    NodeKind::Source(SourceParams::new(shape))
}

fn place(h: &mut Hierarchy, id: NodeId, at: DVec3) {
    if let Some(node) = h.get_mut(id) {
        node.local_transform = DMat4::from_translation(at);
    }
}

/// Builds the named fixture with its result bound to `<name>`.
fn fixture(name: &str, offset: f64) -> (Hierarchy, NodeId) {
    let mut h = Hierarchy::new();
    let root = h.add_bounds(format!("{name}_Bounds"), BoundsSettings::default());
    h.set_result_name(root, Some(name.to_string())).unwrap();
    match name {
        "cube_test" => {
            let cube = h.add_child(root, "Cube", source(ShapeKind::Cube)).unwrap();
            place(&mut h, cube, DVec3::new(offset, 0.0, 0.0));
        }
        "group_test" => {
            let group = h
                .add_child(root, "Group", NodeKind::Group(GroupParams::default()))
                .unwrap();
            place(&mut h, group, DVec3::new(0.0, offset, 0.0));
            for (i, shape) in [ShapeKind::Sphere, ShapeKind::Cone].into_iter().enumerate() {
                let child = h.add_child(group, format!("Child{i}"), source(shape)).unwrap();
                place(&mut h, child, DVec3::new(0.5 * i as f64, 0.0, 0.0));
            }
        }
        _ => {
            let torus = h.add_child(root, "Torus", source(ShapeKind::torus())).unwrap();
            let hidden = h.add_child(root, "Hidden", source(ShapeKind::Cube)).unwrap();
            h.get_mut(hidden).unwrap().visible = false;
            place(&mut h, torus, DVec3::new(0.0, 0.0, offset));
        }
    }
    (h, root)
}

/// Rebuilds a case's fixture at final resolution into its output path.
struct FixtureRunner {
    offset: f64,
}

impl CaseRunner for FixtureRunner {
    fn produce(&mut self, case: &TestCase) -> Result<(), BoxError> {
        let dir = case.output.parent().ok_or("output has no directory")?;
        let stem = case
            .output
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or("output has no name")?;
        let (mut h, root) = fixture(stem, self.offset);
        let mut d = driver(dir);
        let outcome = d
            .request_final(&mut h, root, 0.0)?
            .ok_or("final rebuild was deferred")?;
        outcome.result?;
        Ok(())
    }
}

const CASES: [&str; 3] = ["cube_test", "group_test", "torus_test"];

fn generate_all(dir: &Path, offset: f64) {
    let mut runner = FixtureRunner { offset };
    for name in CASES {
        let output = dir.join(format!("{name}.obj"));
        let case = TestCase {
            name: name.to_string(),
            ground_truth: fieldforge_harness::ground_truth_path(&output),
            output,
        };
        runner.produce(&case).unwrap();
    }
}

fn ground_truth_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with(GROUND_TRUTH_SUFFIX))
        .collect();
    files.sort();
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_unchanged_hierarchy_builds_identical_geometry() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    generate_all(first.path(), 0.25);
    generate_all(second.path(), 0.25);

    for name in CASES {
        let a = first.path().join(format!("{name}.obj"));
        let b = second.path().join(format!("{name}.obj"));
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap(), "{name}");
        let (a, b) = (read_obj(&a).unwrap(), read_obj(&b).unwrap());
        assert_eq!(compare_meshes(&a, &b, DEFAULT_TOLERANCE), Ok(()));
    }
}

#[test]
fn test_set_ground_truth_over_three_outputs() {
    let dir = tempfile::tempdir().unwrap();
    generate_all(dir.path(), 0.0);
    assert!(ground_truth_files(dir.path()).is_empty());

    let written = accept_all(dir.path()).unwrap();
    assert_eq!(written.len(), 3);

    let files = ground_truth_files(dir.path());
    assert_eq!(files.len(), 3);
    for name in CASES {
        let output = fs::read(dir.path().join(format!("{name}.obj"))).unwrap();
        let truth = fs::read(dir.path().join(format!("{name}{GROUND_TRUTH_SUFFIX}"))).unwrap();
        assert_eq!(output, truth, "{name}");
    }
}

#[test]
fn test_suite_passes_after_accept_and_detects_regressions() {
    let dir = tempfile::tempdir().unwrap();
    generate_all(dir.path(), 0.0);
    accept_all(dir.path()).unwrap();
    let suite = Suite::new(dir.path(), DEFAULT_TOLERANCE);

    let report = suite.run(&mut FixtureRunner { offset: 0.0 }).unwrap();
    assert_eq!(report.results.len(), 3);
    assert!(report.all_passed());

    let before: Vec<Vec<u8>> = ground_truth_files(dir.path())
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();

    // A moved shape is a regression in every case.
    let report = suite.run(&mut FixtureRunner { offset: 0.5 }).unwrap();
    assert_eq!(report.failed(), 3);
    assert_eq!(report.exit_code(), 1);
    assert!(
        report
            .results
            .iter()
            .all(|r| matches!(r.outcome, Err(CaseFailure::Mismatch(_))))
    );

    // Comparing never rewrites the references.
    let after: Vec<Vec<u8>> = ground_truth_files(dir.path())
        .iter()
        .map(|p| fs::read(p).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_single_accept_rebaselines_one_case() {
    let dir = tempfile::tempdir().unwrap();
    generate_all(dir.path(), 0.0);
    accept_all(dir.path()).unwrap();
    generate_all(dir.path(), 0.5);

    accept(dir.path(), Path::new("cube_test.obj")).unwrap();
    let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
        .run(&mut ExistingOutputs)
        .unwrap();
    let passed: Vec<&str> = report
        .results
        .iter()
        .filter(|r| r.passed())
        .map(|r| r.case.name.as_str())
        .collect();
    assert_eq!(passed, vec!["cube_test"]);
}

#[test]
fn test_sub_precision_edit_is_not_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let (mut h, root) = fixture("cube_test", 0.0);
    let cube = h.node(root).unwrap().children()[0];
    let mut d = driver(dir.path());

    assert!(d.notify_changed(&h, cube, 0.0).unwrap());
    assert_eq!(d.pump(&mut h, 0.35).unwrap().len(), 1);
    let output = dir.path().join("cube_test.obj");
    let first = fs::read(&output).unwrap();

    place(&mut h, cube, DVec3::new(1e-7, 0.0, 0.0));
    assert!(!d.notify_changed(&h, cube, 1.0).unwrap());
    assert!(d.pump(&mut h, 2.0).unwrap().is_empty());
    assert_eq!(fs::read(&output).unwrap(), first);

    place(&mut h, cube, DVec3::new(0.1, 0.0, 0.0));
    assert!(d.notify_changed(&h, cube, 3.0).unwrap());
    assert_eq!(d.pump(&mut h, 3.4).unwrap().len(), 1);
    assert_ne!(fs::read(&output).unwrap(), first);
}
