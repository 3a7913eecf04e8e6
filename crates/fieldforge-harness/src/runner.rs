//! Regenerating case outputs through the host application.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::{BoxError, ExportError};
use crate::suite::{CaseRunner, TestCase};

/// Environment variable carrying the case name to the export command.
pub const CASE_NAME_ENV: &str = "FIELDFORGE_CASE";

/// Runs the configured host export command once per case.
///
/// The command is invoked as `program args... <output>` with
/// [`CASE_NAME_ENV`] set to the case name. Any previous output is removed
/// first so a command that writes nothing fails the case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl ExportCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
        }
    }

    /// Builds a command from `[program, args...]`. Returns `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// Directory the command runs in.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn export(&self, case: &TestCase) -> Result<(), ExportError> {
        match fs::remove_file(&case.output) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ExportError::ClearOutput {
                    path: case.output.clone(),
                    source,
                });
            }
        }

        // The command may run elsewhere, so it always gets an absolute path.
        let output_path =
            std::path::absolute(&case.output).unwrap_or_else(|_| case.output.clone());
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&output_path)
            .env(CASE_NAME_ENV, &case.name);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        debug!("Exporting {} with `{}`", case.name, self.program);
        let output = command.output().map_err(|source| ExportError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ExportError::Failed {
                case: case.name.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl CaseRunner for ExportCommand {
    fn produce(&mut self, case: &TestCase) -> Result<(), BoxError> {
        self.export(case)?;
        Ok(())
    }
}
