pub mod comm;
pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod kernel;
pub mod logging;
pub mod matrix;
pub mod participant;
pub mod partition;
pub mod polynomial;
pub mod protocol;
pub mod reference;
pub mod report;

pub use comm::{Communicator, LocalGroup, Message, ROOT};
pub use config::{MatrixConfig, PolynomialConfig};
pub use driver::{
    execute, run_matrix, run_matrix_benchmark, run_polynomial, run_polynomial_benchmark,
    PhaseOutcome,
};
pub use error::{DistMulError, Result};
pub use kernel::{Operands, Representation};
pub use matrix::{CsrMatrix, DenseMatrix};
pub use participant::{ComputeParticipant, Coordinator, Role, Worker, Workload};
pub use partition::{partitions, Partition};
pub use polynomial::{Polynomial, PolynomialPair};
pub use protocol::{Schedule, Startup, Step};
pub use report::{MatrixReport, PhaseReport, PhaseTimings, PolynomialReport};

#[cfg(feature = "mpi")]
pub use comm::MpiComm;

/// Takes root's value out of per-rank results, failing if root produced none.
fn root_value<T>(results: Vec<Option<T>>) -> Result<T> {
    results
        .into_iter()
        .nth(ROOT)
        .flatten()
        .ok_or(DistMulError::PayloadType("root report"))
}

/// Runs the matrix-vector benchmark on `processes` in-process ranks and
/// returns root's report.
pub fn matrix_in_process(processes: usize, config: &MatrixConfig) -> Result<MatrixReport> {
    let reports = LocalGroup::run(processes, |comm| run_matrix(comm, config))?;
    root_value(reports)
}

/// Runs the polynomial benchmark on `processes` in-process ranks and returns
/// root's report.
pub fn polynomial_in_process(processes: usize, config: &PolynomialConfig) -> Result<PolynomialReport> {
    let reports = LocalGroup::run(processes, |comm| run_polynomial(comm, config))?;
    root_value(reports)
}

#[cfg(test)]
mod tests;
