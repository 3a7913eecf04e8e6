//! Re-baselining: overwrite references with the current outputs.
//!
//! This is the only code that writes `*_ground_truth.obj` files and it only
//! runs when a user asks for it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::HarnessError;
use crate::suite::{ground_truth_path, is_ground_truth, obj_files};

/// Copies every generated `.obj` under `tests_dir` over its reference.
/// Returns the written reference paths.
pub fn accept_all(tests_dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    if !tests_dir.is_dir() {
        return Err(HarnessError::MissingTestsDir(tests_dir.to_path_buf()));
    }

    let mut written = Vec::new();
    for output in obj_files(tests_dir)?
        .into_iter()
        .filter(|p| !is_ground_truth(p))
    {
        written.push(copy_to_ground_truth(&output)?);
    }
    info!(
        "Set {} ground truth file(s) under {}",
        written.len(),
        tests_dir.display()
    );
    Ok(written)
}

/// Copies one generated `.obj` over its reference. `relative` is resolved
/// against `tests_dir` unless it is absolute.
pub fn accept(tests_dir: &Path, relative: &Path) -> Result<PathBuf, HarnessError> {
    let output = tests_dir.join(relative);
    let is_obj = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
    if !is_obj || is_ground_truth(&output) {
        return Err(HarnessError::NotAnOutput(output));
    }
    if !output.is_file() {
        return Err(HarnessError::MissingOutput(output));
    }
    copy_to_ground_truth(&output)
}

fn copy_to_ground_truth(output: &Path) -> Result<PathBuf, HarnessError> {
    let ground_truth = ground_truth_path(output);
    fs::copy(output, &ground_truth).map_err(|source| HarnessError::Io {
        path: ground_truth.clone(),
        source,
    })?;
    info!("Ground truth set: {}", ground_truth.display());
    Ok(ground_truth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cube")).unwrap();
        fs::write(dir.path().join("cube/cube.obj"), "v 0 0 0\n").unwrap();
        fs::write(dir.path().join("other.obj"), "v 1 1 1\n").unwrap();

        let written = accept(dir.path(), Path::new("cube/cube.obj")).unwrap();
        assert_eq!(written, dir.path().join("cube/cube_ground_truth.obj"));
        assert_eq!(fs::read_to_string(&written).unwrap(), "v 0 0 0\n");
        assert!(!dir.path().join("other_ground_truth.obj").exists());
    }

    #[test]
    fn test_accept_overwrites_existing_reference() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), "v 2 2 2\n").unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), "v 0 0 0\n").unwrap();
        accept(dir.path(), Path::new("a.obj")).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a_ground_truth.obj")).unwrap(),
            "v 2 2 2\n"
        );
    }

    #[test]
    fn test_accept_rejects_references_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        assert!(matches!(
            accept(dir.path(), Path::new("a_ground_truth.obj")),
            Err(HarnessError::NotAnOutput(_))
        ));
        assert!(matches!(
            accept(dir.path(), Path::new("a.txt")),
            Err(HarnessError::NotAnOutput(_))
        ));
        assert!(matches!(
            accept(dir.path(), Path::new("missing.obj")),
            Err(HarnessError::MissingOutput(_))
        ));
    }

    #[test]
    fn test_accept_all_skips_references() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.obj"), "v 0 0 0\n").unwrap();
        fs::write(dir.path().join("a_ground_truth.obj"), "old").unwrap();

        let written = accept_all(dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("a_ground_truth.obj")]);
        assert!(!dir.path().join("a_ground_truth_ground_truth.obj").exists());
    }
}
