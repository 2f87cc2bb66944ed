pub mod coverage;
pub mod extract;
pub mod model;

pub use coverage::{
    enumerate, BranchCoverage, CoverageStrategy, EnumerateError, EnumerationRun, PathCoverage,
    RunLimits, StopReason,
};
pub use extract::{extract_test_case, TestCase};
pub use model::{ConstraintModel, ModelError, Role, ValueRange, Variable};
