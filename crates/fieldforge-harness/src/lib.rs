//! Ground-truth regression harness.
//!
//! Each test case is a generated `<name>.obj` next to its reference
//! `<name>_ground_truth.obj`. [`Suite`] compares the two and never writes a
//! reference; [`accept_all`] and [`accept`] are the explicit re-baselining
//! workflow. [`ExportCommand`] regenerates each output through the host
//! before it is compared.

pub mod accept;
pub mod error;
pub mod runner;
pub mod suite;

pub use accept::{accept, accept_all};
pub use error::{BoxError, CaseFailure, ExportError, HarnessError};
pub use runner::{CASE_NAME_ENV, ExportCommand};
pub use suite::{
    CaseResult, CaseRunner, ExistingOutputs, GROUND_TRUTH_SUFFIX, Suite, SuiteReport, TestCase,
    ground_truth_path, is_ground_truth,
};
