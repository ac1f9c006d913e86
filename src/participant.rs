//! Participant roles.
//!
//! A [`Coordinator`] owns the generated inputs and the authoritative result;
//! a [`Worker`] owns nothing beyond its transient buffers. Both implement
//! [`ComputeParticipant`], which only decides what a participant contributes
//! to each step of the shared schedule.

use crate::comm::Communicator;
use crate::error::{DistMulError, Result};
use crate::kernel::{Operands, Representation};
use crate::matrix::{CsrMatrix, DenseMatrix};
use crate::polynomial::PolynomialPair;
use std::time::{Duration, Instant};
use tracing::debug;

/// Root-side inputs of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Workload {
    Matrix {
        matrix: DenseMatrix,
        /// Starting vector of every phase; never modified.
        initial: Vec<i64>,
    },
    Polynomial(PolynomialPair),
}

impl Workload {
    /// Size announced at the start of each phase: matrix order, or grade.
    pub fn problem_size(&self) -> u64 {
        match self {
            Self::Matrix { matrix, .. } => matrix.size as u64,
            Self::Polynomial(pair) => pair.a.grade() as u64,
        }
    }
}

/// Capability shared by every role: a communicator plus the contributions
/// the role makes to the schedule's steps.
pub trait ComputeParticipant {
    type Comm: Communicator;

    fn comm(&self) -> &Self::Comm;

    /// Resets per-phase state before a new representation runs.
    fn begin_phase(&mut self, _representation: Representation) {}

    fn offer_size(&self) -> Option<u64>;

    fn offer_operands(&mut self) -> Option<Operands>;

    fn offer_vector(&self) -> Option<Vec<i64>>;

    /// Receives the reduced vector after each round; `None` on workers.
    fn adopt(&mut self, reduced: Option<&[i64]>) -> Result<()>;

    /// Time spent preparing operands in the current phase.
    fn construction_time(&self) -> Duration {
        Duration::ZERO
    }
}

pub struct Coordinator<C> {
    comm: C,
    workload: Workload,
    representation: Representation,
    current: Vec<i64>,
    construction: Duration,
}

impl<C: Communicator> Coordinator<C> {
    pub fn new(comm: C, workload: Workload) -> Result<Self> {
        if !comm.is_root() {
            return Err(DistMulError::InvalidRank {
                rank: comm.rank(),
                size: comm.size(),
            });
        }
        let current = match &workload {
            Workload::Matrix { initial, .. } => initial.clone(),
            Workload::Polynomial(_) => Vec::new(),
        };
        Ok(Self {
            comm,
            workload,
            representation: Representation::Sparse,
            current,
            construction: Duration::ZERO,
        })
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    /// The vector the next round will broadcast.
    pub fn current(&self) -> &[i64] {
        &self.current
    }
}

impl<C: Communicator> ComputeParticipant for Coordinator<C> {
    type Comm = C;

    fn comm(&self) -> &C {
        &self.comm
    }

    fn begin_phase(&mut self, representation: Representation) {
        self.representation = representation;
        self.construction = Duration::ZERO;
        if let Workload::Matrix { initial, .. } = &self.workload {
            self.current.clone_from(initial);
        }
    }

    fn offer_size(&self) -> Option<u64> {
        Some(self.workload.problem_size())
    }

    fn offer_operands(&mut self) -> Option<Operands> {
        let operands = match (&self.workload, self.representation) {
            (Workload::Matrix { matrix, .. }, Representation::Sparse) => {
                let start = Instant::now();
                let csr = CsrMatrix::from_dense(matrix);
                self.construction = start.elapsed();
                debug!(nnz = csr.nnz(), elapsed = ?self.construction, "built CSR operands");
                Operands::Sparse(csr)
            }
            (Workload::Matrix { matrix, .. }, Representation::Dense) => {
                Operands::Dense(matrix.clone())
            }
            (Workload::Polynomial(pair), _) => Operands::Polynomials(pair.clone()),
        };
        Some(operands)
    }

    fn offer_vector(&self) -> Option<Vec<i64>> {
        Some(self.current.clone())
    }

    fn adopt(&mut self, reduced: Option<&[i64]>) -> Result<()> {
        let reduced = reduced.ok_or(DistMulError::PayloadType("reduced result"))?;
        self.current.clear();
        self.current.extend_from_slice(reduced);
        Ok(())
    }

    fn construction_time(&self) -> Duration {
        self.construction
    }
}

pub struct Worker<C> {
    comm: C,
}

impl<C: Communicator> Worker<C> {
    pub fn new(comm: C) -> Result<Self> {
        if comm.is_root() {
            return Err(DistMulError::InvalidRank {
                rank: comm.rank(),
                size: comm.size(),
            });
        }
        Ok(Self { comm })
    }
}

impl<C: Communicator> ComputeParticipant for Worker<C> {
    type Comm = C;

    fn comm(&self) -> &C {
        &self.comm
    }

    fn offer_size(&self) -> Option<u64> {
        None
    }

    fn offer_operands(&mut self) -> Option<Operands> {
        None
    }

    fn offer_vector(&self) -> Option<Vec<i64>> {
        None
    }

    fn adopt(&mut self, _reduced: Option<&[i64]>) -> Result<()> {
        Ok(())
    }
}

/// The role a process plays, chosen once from its rank.
pub enum Role<C> {
    Coordinator(Coordinator<C>),
    Worker(Worker<C>),
}

impl<C: Communicator> Role<C> {
    /// Root becomes the coordinator and builds its workload; every other
    /// rank becomes a worker and never calls `workload`.
    pub fn select<F>(comm: C, workload: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Workload>,
    {
        if comm.is_root() {
            Ok(Self::Coordinator(Coordinator::new(comm, workload()?)?))
        } else {
            Ok(Self::Worker(Worker::new(comm)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalGroup;
    use crate::matrix::DenseMatrix;

    fn matrix_workload() -> Workload {
        Workload::Matrix {
            matrix: DenseMatrix::from_rows(&[vec![1, 0], vec![0, 2]]).unwrap(),
            initial: vec![3, 4],
        }
    }

    #[test]
    fn test_role_selection_by_rank() {
        let roles = LocalGroup::run(3, |comm| {
            let role = Role::select(comm, || Ok(matrix_workload()))?;
            Ok(matches!(role, Role::Coordinator(_)))
        })
        .unwrap();
        assert_eq!(roles, vec![true, false, false]);
    }

    #[test]
    fn test_coordinator_restores_initial_vector() {
        let comm = LocalGroup::create(1).unwrap().remove(0);
        let mut coordinator = Coordinator::new(comm, matrix_workload()).unwrap();

        coordinator.begin_phase(Representation::Sparse);
        assert!(matches!(coordinator.offer_operands(), Some(Operands::Sparse(_))));
        coordinator.adopt(Some(&[30, 80])).unwrap();
        assert_eq!(coordinator.current(), &[30, 80]);

        coordinator.begin_phase(Representation::Dense);
        assert_eq!(coordinator.current(), &[3, 4]);
        assert_eq!(coordinator.construction_time(), Duration::ZERO);
        assert!(matches!(coordinator.offer_operands(), Some(Operands::Dense(_))));
        assert_eq!(coordinator.offer_size(), Some(2));
    }

    #[test]
    fn test_roles_reject_wrong_rank() {
        let mut group = LocalGroup::create(2).unwrap();
        let worker_comm = group.pop().unwrap();
        let root_comm = group.pop().unwrap();
        assert!(Coordinator::new(worker_comm, matrix_workload()).is_err());
        assert!(Worker::new(root_comm).is_err());
    }
}
