//! Test case discovery and comparison.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fieldforge_mesh::{ObjError, compare_meshes, read_obj};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BoxError, CaseFailure, HarnessError};

/// File name suffix of reference meshes.
pub const GROUND_TRUTH_SUFFIX: &str = "_ground_truth.obj";

/// Returns `true` if `path` names a reference mesh.
pub fn is_ground_truth(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(GROUND_TRUTH_SUFFIX))
}

fn is_obj(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
}

/// Reference path for a generated output: `dir/name.obj` maps to
/// `dir/name_ground_truth.obj`.
pub fn ground_truth_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}{GROUND_TRUTH_SUFFIX}"))
}

fn output_path(ground_truth: &Path) -> Option<PathBuf> {
    let name = ground_truth.file_name()?.to_str()?;
    let stem = name.strip_suffix(GROUND_TRUTH_SUFFIX)?;
    Some(ground_truth.with_file_name(format!("{stem}.obj")))
}

/// One generated mesh and its reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    /// Path of the output relative to the tests directory, without extension.
    pub name: String,
    pub output: PathBuf,
    pub ground_truth: PathBuf,
}

/// Produces the generated output of a case before it is compared.
pub trait CaseRunner {
    fn produce(&mut self, case: &TestCase) -> Result<(), BoxError>;
}

/// Uses whatever the host export step already wrote.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExistingOutputs;

impl CaseRunner for ExistingOutputs {
    fn produce(&mut self, _case: &TestCase) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Outcome of one case.
#[derive(Debug)]
pub struct CaseResult {
    pub case: TestCase,
    pub outcome: Result<(), CaseFailure>,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// Every case passed. An empty suite passes.
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> u8 {
        if self.all_passed() { 0 } else { 1 }
    }
}

/// The regression suite over one tests directory.
#[derive(Clone, Debug)]
pub struct Suite {
    tests_dir: PathBuf,
    tolerance: f64,
}

impl Suite {
    pub fn new(tests_dir: impl Into<PathBuf>, tolerance: f64) -> Self {
        Self {
            tests_dir: tests_dir.into(),
            tolerance,
        }
    }

    pub fn tests_dir(&self) -> &Path {
        &self.tests_dir
    }

    /// Finds every case under the tests directory.
    ///
    /// A case exists for each generated `.obj` and for each reference whose
    /// output is missing, so a vanished output still shows up as a failure.
    pub fn discover(&self) -> Result<Vec<TestCase>, HarnessError> {
        if !self.tests_dir.is_dir() {
            return Err(HarnessError::MissingTestsDir(self.tests_dir.clone()));
        }

        let mut cases = BTreeMap::new();
        for path in obj_files(&self.tests_dir)? {
            let (output, ground_truth) = if is_ground_truth(&path) {
                match output_path(&path) {
                    Some(output) => (output, path),
                    None => continue,
                }
            } else {
                let ground_truth = ground_truth_path(&path);
                (path, ground_truth)
            };
            let name = output
                .strip_prefix(&self.tests_dir)
                .unwrap_or(&output)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            cases.entry(name.clone()).or_insert(TestCase {
                name,
                output,
                ground_truth,
            });
        }
        Ok(cases.into_values().collect())
    }

    /// Produces and compares every case.
    pub fn run(&self, runner: &mut impl CaseRunner) -> Result<SuiteReport, HarnessError> {
        let cases = self.discover()?;
        info!(
            "Running {} case(s) under {}",
            cases.len(),
            self.tests_dir.display()
        );

        let mut report = SuiteReport::default();
        for case in cases {
            let outcome = runner
                .produce(&case)
                .map_err(CaseFailure::Runner)
                .and_then(|()| self.check(&case));
            match &outcome {
                Ok(()) => info!("{} matches ground truth", case.name),
                Err(failure) => warn!("{} does NOT match ground truth: {failure}", case.name),
            }
            report.results.push(CaseResult { case, outcome });
        }

        info!("{} passed, {} failed", report.passed(), report.failed());
        Ok(report)
    }

    /// Compares one case's output with its reference.
    pub fn check(&self, case: &TestCase) -> Result<(), CaseFailure> {
        let expected = read_obj(&case.ground_truth).map_err(|e| match e {
            ObjError::FileNotFound { path } => CaseFailure::MissingGroundTruth(path),
            source => CaseFailure::Unreadable {
                path: case.ground_truth.clone(),
                source,
            },
        })?;
        let generated = read_obj(&case.output).map_err(|e| match e {
            ObjError::FileNotFound { path } => CaseFailure::MissingOutput(path),
            source => CaseFailure::Unreadable {
                path: case.output.clone(),
                source,
            },
        })?;
        debug!(
            "{}: {} vertices / {} faces vs {} / {}",
            case.name,
            generated.vertex_count(),
            generated.face_count(),
            expected.vertex_count(),
            expected.face_count()
        );
        compare_meshes(&generated, &expected, self.tolerance)?;
        Ok(())
    }
}

/// Every `.obj` file under `dir`, in sorted order.
pub(crate) fn obj_files(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| HarnessError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_obj(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldforge_mesh::DEFAULT_TOLERANCE;
    use std::fs;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_ground_truth_naming() {
        let output = Path::new("tests/cube/cube_test.obj");
        let truth = ground_truth_path(output);
        assert_eq!(truth, Path::new("tests/cube/cube_test_ground_truth.obj"));
        assert!(is_ground_truth(&truth));
        assert!(!is_ground_truth(output));
        assert_eq!(output_path(&truth).as_deref(), Some(output));
    }

    #[test]
    fn test_discover_pairs_outputs_and_references() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("shapes");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.obj"), TRIANGLE).unwrap();
        fs::write(nested.join("a_ground_truth.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("b_ground_truth.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let cases = Suite::new(dir.path(), DEFAULT_TOLERANCE).discover().unwrap();
        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "shapes/a"]);
        assert_eq!(cases[0].output, dir.path().join("b.obj"));
    }

    #[test]
    fn test_missing_ground_truth_fails_and_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), TRIANGLE).unwrap();

        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut ExistingOutputs)
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.results[0].outcome,
            Err(CaseFailure::MissingGroundTruth(_))
        ));
        assert!(!dir.path().join("a_ground_truth.obj").exists());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_missing_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), TRIANGLE).unwrap();
        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut ExistingOutputs)
            .unwrap();
        assert!(matches!(
            report.results[0].outcome,
            Err(CaseFailure::MissingOutput(_))
        ));
    }

    #[test]
    fn test_matching_and_mismatching_cases() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("same.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("same_ground_truth.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("moved.obj"), "v 0 0 0\nv 2 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        fs::write(dir.path().join("moved_ground_truth.obj"), TRIANGLE).unwrap();

        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut ExistingOutputs)
            .unwrap();
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        let moved = report.results.iter().find(|r| r.case.name == "moved").unwrap();
        assert!(matches!(moved.outcome, Err(CaseFailure::Mismatch(_))));
    }

    #[test]
    fn test_unreadable_ground_truth_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), "v 0 0\n").unwrap();
        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut ExistingOutputs)
            .unwrap();
        assert!(matches!(
            report.results[0].outcome,
            Err(CaseFailure::Unreadable { .. })
        ));
    }

    #[test]
    fn test_runner_failure_fails_case() {
        struct Broken;
        impl CaseRunner for Broken {
            fn produce(&mut self, _case: &TestCase) -> Result<(), BoxError> {
                Err("export failed".into())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), TRIANGLE).unwrap();
        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE).run(&mut Broken).unwrap();
        assert!(matches!(report.results[0].outcome, Err(CaseFailure::Runner(_))));
    }

    #[test]
    fn test_outputs_are_produced_before_comparison() {
        struct Regenerate(Vec<String>);
        impl CaseRunner for Regenerate {
            fn produce(&mut self, case: &TestCase) -> Result<(), BoxError> {
                self.0.push(case.name.clone());
                fs::write(&case.output, TRIANGLE)?;
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), "v 5 5 5\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), TRIANGLE).unwrap();
        fs::write(dir.path().join("b_ground_truth.obj"), TRIANGLE).unwrap();

        let mut runner = Regenerate(Vec::new());
        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut runner)
            .unwrap();
        assert!(report.all_passed());
        assert_eq!(runner.0, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_suite_passes_and_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let report = Suite::new(dir.path(), DEFAULT_TOLERANCE)
            .run(&mut ExistingOutputs)
            .unwrap();
        assert!(report.all_passed());
        assert!(matches!(
            Suite::new(dir.path().join("nope"), DEFAULT_TOLERANCE).discover(),
            Err(HarnessError::MissingTestsDir(_))
        ));
    }
}
