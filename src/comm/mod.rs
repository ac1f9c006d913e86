//! Collective communication between the participants of a run.
//!
//! Participants are addressed by rank; rank [`ROOT`] coordinates. Every
//! participant must issue the same collectives in the same order, which the
//! driver guarantees by running a single shared step schedule on all ranks.

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi_comm;

pub use local::LocalGroup;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Rank of the coordinating participant.
pub const ROOT: usize = 0;

/// A value that can be broadcast between participants.
pub trait Message: Clone + Send + Serialize + DeserializeOwned + 'static {}

impl<T> Message for T where T: Clone + Send + Serialize + DeserializeOwned + 'static {}

/// Collective operations required by the distributed kernels.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Distributes `value` from `root` to every participant.
    ///
    /// The root passes `Some(value)`, every other rank passes `None`; all ranks
    /// return an identical copy.
    fn broadcast<T: Message>(&self, value: Option<T>, root: usize) -> Result<T>;

    /// Element-wise wrapping sum of every participant's `partial`, delivered
    /// to `root` only.
    fn reduce_sum(&self, partial: &[i64], root: usize) -> Result<Option<Vec<i64>>>;

    /// Maximum of every participant's `value`, delivered to `root` only.
    fn reduce_max(&self, value: f64, root: usize) -> Result<Option<f64>>;
}
