//! In-process communicator: every rank is an OS thread and ranks talk over
//! point-to-point channels.
//!
//! Each ordered pair of ranks owns a dedicated FIFO channel, so messages from
//! one sender are always consumed in the order they were issued. Envelopes are
//! tagged with the collective that produced them; a rank that receives an
//! envelope from a different collective reports a mismatch instead of reading
//! the wrong data. When a rank stops early its channels close and its peers
//! fail with [`DistMulError::Disconnected`] rather than waiting forever.
//!
//! Channels have zero capacity: a send completes only once the peer has taken
//! the envelope. A broadcast therefore returns on root after every rank has
//! received the value, and a contribution to a reduction is handed over only
//! when root reaches it.

use super::Communicator;
use crate::comm::Message;
use crate::error::{DistMulError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::any::{type_name, Any};
use std::thread;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Collective {
    Broadcast,
    ReduceSum,
    ReduceMax,
}

impl Collective {
    fn name(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::ReduceSum => "reduce-sum",
            Self::ReduceMax => "reduce-max",
        }
    }
}

struct Envelope {
    collective: Collective,
    payload: Box<dyn Any + Send>,
}

/// One rank's endpoint in an in-process group.
pub struct LocalGroup {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` at our own rank.
    outgoing: Vec<Option<Sender<Envelope>>>,
    /// Indexed by source rank; `None` at our own rank.
    incoming: Vec<Option<Receiver<Envelope>>>,
}

impl LocalGroup {
    /// Creates the endpoints of a fully connected group of `size` ranks,
    /// returned in rank order.
    pub fn create(size: usize) -> Result<Vec<LocalGroup>> {
        if size == 0 {
            return Err(DistMulError::InvalidParameters(
                "a group needs at least one participant".to_string(),
            ));
        }

        let mut outgoing: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut incoming: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for src in 0..size {
            for dst in 0..size {
                if src != dst {
                    let (tx, rx) = bounded(0);
                    outgoing[src][dst] = Some(tx);
                    incoming[dst][src] = Some(rx);
                }
            }
        }

        Ok(outgoing
            .into_iter()
            .zip(incoming)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| LocalGroup {
                rank,
                size,
                outgoing,
                incoming,
            })
            .collect())
    }

    /// Runs `participant` once per rank, each on its own thread, and collects
    /// the per-rank results in rank order.
    ///
    /// If any rank fails, the first error that is not a knock-on
    /// disconnection is returned.
    pub fn run<T, F>(size: usize, participant: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(LocalGroup) -> Result<T> + Sync,
    {
        let groups = Self::create(size)?;
        debug!(size, "launching in-process group");

        let outcomes = thread::scope(|scope| -> Result<Vec<thread::Result<Result<T>>>> {
            let participant = &participant;
            let mut handles = Vec::with_capacity(size);
            for group in groups {
                let handle = thread::Builder::new()
                    .name(format!("rank-{}", group.rank))
                    .spawn_scoped(scope, move || participant(group))?;
                handles.push(handle);
            }
            Ok(handles.into_iter().map(|handle| handle.join()).collect())
        })?;

        let mut results = Vec::with_capacity(size);
        let mut errors = Vec::new();
        for (rank, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(err)) => errors.push(err),
                Err(_) => errors.push(DistMulError::ParticipantPanicked(rank)),
            }
        }

        if errors.is_empty() {
            return Ok(results);
        }
        let root_cause = errors
            .iter()
            .position(|err| !matches!(err, DistMulError::Disconnected(_)))
            .unwrap_or(0);
        Err(errors.swap_remove(root_cause))
    }

    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank >= self.size {
            return Err(DistMulError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }

    fn send(&self, dst: usize, collective: Collective, payload: Box<dyn Any + Send>) -> Result<()> {
        let sender = self.outgoing[dst]
            .as_ref()
            .ok_or(DistMulError::InvalidRank {
                rank: dst,
                size: self.size,
            })?;
        sender
            .send(Envelope {
                collective,
                payload,
            })
            .map_err(|_| DistMulError::Disconnected(collective.name()))
    }

    fn recv<T: Any>(&self, src: usize, expected: Collective) -> Result<T> {
        let receiver = self.incoming[src]
            .as_ref()
            .ok_or(DistMulError::InvalidRank {
                rank: src,
                size: self.size,
            })?;
        let envelope = receiver
            .recv()
            .map_err(|_| DistMulError::Disconnected(expected.name()))?;
        if envelope.collective != expected {
            return Err(DistMulError::CollectiveMismatch {
                rank: self.rank,
                expected: expected.name(),
                received: envelope.collective.name(),
            });
        }
        envelope
            .payload
            .downcast::<T>()
            .map(|payload| *payload)
            .map_err(|_| DistMulError::PayloadType(type_name::<T>()))
    }

    fn peers(&self, root: usize) -> impl Iterator<Item = usize> {
        (0..self.size).filter(move |&rank| rank != root)
    }
}

impl Communicator for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast<T: Message>(&self, value: Option<T>, root: usize) -> Result<T> {
        self.check_rank(root)?;
        if self.rank != root {
            return self.recv(root, Collective::Broadcast);
        }

        let value = value.ok_or(DistMulError::PayloadType(type_name::<T>()))?;
        for dst in self.peers(root) {
            self.send(dst, Collective::Broadcast, Box::new(value.clone()))?;
        }
        trace!(rank = self.rank, payload = type_name::<T>(), "broadcast sent");
        Ok(value)
    }

    fn reduce_sum(&self, partial: &[i64], root: usize) -> Result<Option<Vec<i64>>> {
        self.check_rank(root)?;
        if self.rank != root {
            self.send(root, Collective::ReduceSum, Box::new(partial.to_vec()))?;
            return Ok(None);
        }

        let mut total = partial.to_vec();
        for src in self.peers(root) {
            let contribution: Vec<i64> = self.recv(src, Collective::ReduceSum)?;
            if contribution.len() != total.len() {
                return Err(DistMulError::InvalidDimension {
                    expected: total.len(),
                    got: contribution.len(),
                });
            }
            for (acc, value) in total.iter_mut().zip(contribution) {
                *acc = acc.wrapping_add(value);
            }
        }
        trace!(rank = self.rank, len = total.len(), "reduce-sum complete");
        Ok(Some(total))
    }

    fn reduce_max(&self, value: f64, root: usize) -> Result<Option<f64>> {
        self.check_rank(root)?;
        if self.rank != root {
            self.send(root, Collective::ReduceMax, Box::new(value))?;
            return Ok(None);
        }

        let mut max = value;
        for src in self.peers(root) {
            let contribution: f64 = self.recv(src, Collective::ReduceMax)?;
            max = max.max(contribution);
        }
        Ok(Some(max))
    }
}
