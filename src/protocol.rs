//! The step sequence every participant executes.
//!
//! Root and workers walk the same [`Schedule`], so they issue identical
//! collectives in identical order. Role-specific behaviour is limited to what
//! a participant contributes to each step, never which steps it runs.

use crate::config::{MatrixConfig, PolynomialConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// First message of every run, broadcast from root after it parses flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Startup {
    Matrix(MatrixConfig),
    Polynomial(PolynomialConfig),
    /// Root rejected its configuration; everyone stops.
    Abort(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// Root announces the problem size.
    BroadcastSize,
    /// Root distributes the shared operands for this phase.
    BroadcastOperands,
    /// Root distributes the current input vector.
    BroadcastVector,
    /// Each participant derives its own index range.
    Partition,
    /// Each participant fills its share of the result.
    ComputeLocal,
    /// Partials are summed at root.
    Reduce,
    /// Root takes the reduced vector as the next input.
    AdoptResult,
    /// Slowest local compute time is gathered at root.
    ReduceTiming,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Self::BroadcastSize => "broadcast-size",
            Self::BroadcastOperands => "broadcast-operands",
            Self::BroadcastVector => "broadcast-vector",
            Self::Partition => "partition",
            Self::ComputeLocal => "compute-local",
            Self::Reduce => "reduce",
            Self::AdoptResult => "adopt-result",
            Self::ReduceTiming => "reduce-timing",
        }
    }

    /// Whether the step is a collective call that every rank must reach.
    pub fn is_collective(self) -> bool {
        matches!(
            self,
            Self::BroadcastSize
                | Self::BroadcastOperands
                | Self::BroadcastVector
                | Self::Reduce
                | Self::ReduceTiming
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The steps of one phase: setup once, then `iterations` rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    iterations: usize,
    with_vector: bool,
}

impl Schedule {
    /// Matrix-vector phase: each round multiplies against a fresh broadcast of
    /// the root's current vector.
    pub fn matrix(iterations: usize) -> Self {
        Self {
            iterations,
            with_vector: true,
        }
    }

    /// Polynomial product: a single round with no per-round vector.
    pub fn polynomial() -> Self {
        Self {
            iterations: 1,
            with_vector: false,
        }
    }

    /// Number of rounds; zero means setup only.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `(iteration, step)` pairs in execution order. Setup steps report
    /// iteration 0.
    pub fn steps(&self) -> Steps {
        Steps {
            schedule: *self,
            iteration: 0,
            state: Some(Step::BroadcastSize),
        }
    }

    /// Number of collective calls a phase issues.
    pub fn collective_count(&self) -> usize {
        self.steps().filter(|(_, step)| step.is_collective()).count()
    }
}

pub struct Steps {
    schedule: Schedule,
    iteration: usize,
    state: Option<Step>,
}

impl Steps {
    fn round_start(&self) -> Step {
        if self.iteration >= self.schedule.iterations {
            Step::ReduceTiming
        } else if self.schedule.with_vector {
            Step::BroadcastVector
        } else {
            Step::Partition
        }
    }
}

impl Iterator for Steps {
    type Item = (usize, Step);

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.state?;
        let item = (self.iteration, step);

        self.state = match step {
            Step::BroadcastSize => Some(Step::BroadcastOperands),
            Step::BroadcastOperands => Some(self.round_start()),
            Step::BroadcastVector => Some(Step::Partition),
            Step::Partition => Some(Step::ComputeLocal),
            Step::ComputeLocal => Some(Step::Reduce),
            Step::Reduce => Some(Step::AdoptResult),
            Step::AdoptResult => {
                self.iteration += 1;
                Some(self.round_start())
            }
            Step::ReduceTiming => None,
        };

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_schedule_order() {
        let steps: Vec<_> = Schedule::matrix(2).steps().collect();
        let expected = vec![
            (0, Step::BroadcastSize),
            (0, Step::BroadcastOperands),
            (0, Step::BroadcastVector),
            (0, Step::Partition),
            (0, Step::ComputeLocal),
            (0, Step::Reduce),
            (0, Step::AdoptResult),
            (1, Step::BroadcastVector),
            (1, Step::Partition),
            (1, Step::ComputeLocal),
            (1, Step::Reduce),
            (1, Step::AdoptResult),
            (2, Step::ReduceTiming),
        ];
        assert_eq!(steps, expected);
    }

    #[test]
    fn test_polynomial_schedule() {
        let steps: Vec<Step> = Schedule::polynomial().steps().map(|(_, s)| s).collect();
        assert_eq!(
            steps,
            vec![
                Step::BroadcastSize,
                Step::BroadcastOperands,
                Step::Partition,
                Step::ComputeLocal,
                Step::Reduce,
                Step::AdoptResult,
                Step::ReduceTiming,
            ]
        );
        assert_eq!(Schedule::polynomial().collective_count(), 4);
    }

    #[test]
    fn test_collective_count_scales_with_iterations() {
        // size, operands, timing, plus vector and reduce per round
        assert_eq!(Schedule::matrix(0).collective_count(), 3);
        assert_eq!(Schedule::matrix(5).collective_count(), 13);
    }
}
