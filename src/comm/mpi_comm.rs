//! MPI-backed communicator for runs launched with `mpirun -n N`.
//!
//! Structured payloads travel as a length broadcast followed by their
//! serialised bytes; reductions map directly onto MPI `SUM` and `MAX`.
//! A zero length means root had nothing to send, and every rank fails the
//! broadcast together.

use super::{Communicator, Message};
use crate::error::{DistMulError, Result};
use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use std::any::type_name;

pub struct MpiComm {
    world: SimpleCommunicator,
    _universe: Universe,
}

impl MpiComm {
    /// Initialises MPI for this process. Dropping the communicator finalises it.
    pub fn initialize() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| DistMulError::Communication("MPI already initialised".to_string()))?;
        let world = universe.world();
        Ok(Self {
            world,
            _universe: universe,
        })
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn broadcast<T: Message>(&self, value: Option<T>, root: usize) -> Result<T> {
        let root_process = self.world.process_at_rank(root as i32);

        let encoded = match (self.rank() == root, value) {
            (true, Some(value)) => {
                serde_json::to_vec(&value).map_err(|e| DistMulError::Communication(e.to_string()))
            }
            (true, None) => Err(DistMulError::PayloadType(type_name::<T>())),
            (false, _) => Ok(Vec::new()),
        };

        // Root announces the length even when it has nothing to send.
        let mut len = encoded.as_ref().map_or(0, |bytes| bytes.len() as u64);
        root_process.broadcast_into(&mut len);
        if len == 0 {
            return Err(encoded
                .err()
                .unwrap_or(DistMulError::PayloadType(type_name::<T>())));
        }
        let mut bytes = encoded?;
        bytes.resize(len as usize, 0);
        root_process.broadcast_into(&mut bytes[..]);

        serde_json::from_slice(&bytes).map_err(|e| DistMulError::Communication(e.to_string()))
    }

    fn reduce_sum(&self, partial: &[i64], root: usize) -> Result<Option<Vec<i64>>> {
        let root_process = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            let mut total = vec![0i64; partial.len()];
            root_process.reduce_into_root(partial, &mut total[..], SystemOperation::sum());
            Ok(Some(total))
        } else {
            root_process.reduce_into(partial, SystemOperation::sum());
            Ok(None)
        }
    }

    fn reduce_max(&self, value: f64, root: usize) -> Result<Option<f64>> {
        let root_process = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            let mut max = 0.0f64;
            root_process.reduce_into_root(&value, &mut max, SystemOperation::max());
            Ok(Some(max))
        } else {
            root_process.reduce_into(&value, SystemOperation::max());
            Ok(None)
        }
    }
}
