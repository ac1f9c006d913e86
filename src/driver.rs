//! Schedule execution and the two benchmark drivers.
//!
//! [`execute`] walks one phase of a [`Schedule`] on one participant. The
//! benchmark entry points agree on a [`Startup`] message first, pick the
//! participant's role, and run one phase per representation.

use crate::comm::{Communicator, ROOT};
use crate::config::{MatrixConfig, PolynomialConfig};
use crate::error::{DistMulError, Result};
use crate::generator;
use crate::kernel::{Operands, Representation};
use crate::participant::{ComputeParticipant, Role, Workload};
use crate::partition::Partition;
use crate::polynomial::Polynomial;
use crate::protocol::{Schedule, Startup, Step};
use crate::reference;
use crate::report::{MatrixReport, PhaseReport, PhaseTimings, PolynomialReport};
use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info, trace, warn};

/// What one participant observed while running a phase.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseOutcome {
    pub timings: PhaseTimings,
    /// Reduced vector of the last round; root only.
    pub result: Option<Vec<i64>>,
}

fn missing(step: Step) -> DistMulError {
    DistMulError::InvalidParameters(format!("step {step} reached before its inputs"))
}

/// Runs every step of `schedule` on `participant`.
///
/// All ranks must call this with the same schedule; the collectives they
/// issue then line up one to one.
pub fn execute<P: ComputeParticipant>(participant: &mut P, schedule: &Schedule) -> Result<PhaseOutcome> {
    let rank = participant.comm().rank();
    let workers = participant.comm().size();
    let _span = debug_span!("phase", rank).entered();

    let mut timings = PhaseTimings::default();
    let phase_start = Instant::now();
    let mut rounds_start = None;

    let mut size = 0u64;
    let mut operands: Option<Operands> = None;
    let mut vector: Option<Vec<i64>> = None;
    let mut partition: Option<Partition> = None;
    let mut partial: Vec<i64> = Vec::new();
    let mut reduced: Option<Vec<i64>> = None;
    let mut result = None;
    let mut collectives = 0;

    for (iteration, step) in schedule.steps() {
        trace!(rank, iteration, %step, "step");
        let start = Instant::now();

        match step {
            Step::BroadcastSize => {
                size = participant
                    .comm()
                    .broadcast(participant.offer_size(), ROOT)?;
                collectives += 1;
                timings.broadcast += start.elapsed();
            }
            Step::BroadcastOperands => {
                let offered = participant.offer_operands();
                let construction = participant.construction_time();
                let received: Operands = participant.comm().broadcast(offered, ROOT)?;
                collectives += 1;
                timings.construction = construction;
                timings.broadcast += start.elapsed().saturating_sub(construction);

                if received.problem_size() != size {
                    return Err(DistMulError::InvalidDimension {
                        expected: size as usize,
                        got: received.problem_size() as usize,
                    });
                }
                if let Operands::Sparse(csr) = &received {
                    csr.validate()?;
                }
                partial = vec![0; received.output_len()];
                debug!(rank, size, output_len = partial.len(), "operands received");
                operands = Some(received);
                rounds_start = Some(Instant::now());
            }
            Step::BroadcastVector => {
                vector = Some(
                    participant
                        .comm()
                        .broadcast(participant.offer_vector(), ROOT)?,
                );
                collectives += 1;
                timings.vector_broadcast += start.elapsed();
            }
            Step::Partition => {
                let ops = operands.as_ref().ok_or_else(|| missing(step))?;
                let part = Partition::for_rank(ops.output_len(), workers, rank)?;
                if iteration == 0 {
                    debug!(rank, start = part.start, end = part.end, "partition");
                }
                partition = Some(part);
            }
            Step::ComputeLocal => {
                let ops = operands.as_ref().ok_or_else(|| missing(step))?;
                let part = partition.as_ref().ok_or_else(|| missing(step))?;
                partial.fill(0);
                ops.compute(vector.as_deref(), part, &mut partial)?;
                timings.local_compute += start.elapsed();
            }
            Step::Reduce => {
                reduced = participant.comm().reduce_sum(&partial, ROOT)?;
                collectives += 1;
                timings.reduce += start.elapsed();
            }
            Step::AdoptResult => {
                participant.adopt(reduced.as_deref())?;
                result = reduced.take();
                if let Some(started) = rounds_start {
                    timings.rounds = started.elapsed();
                }
            }
            Step::ReduceTiming => {
                timings.slowest_compute = participant
                    .comm()
                    .reduce_max(timings.local_compute.as_secs_f64(), ROOT)?
                    .map(Duration::from_secs_f64);
                collectives += 1;
            }
        }
    }

    // Every rank must have issued exactly the schedule's collectives.
    debug_assert_eq!(collectives, schedule.collective_count());

    // With no rounds, root's result is its input vector unchanged.
    if result.is_none() && schedule.iterations() == 0 {
        result = participant.offer_vector();
    }

    timings.total = phase_start.elapsed();
    debug!(rank, collectives, total = ?timings.total, "phase complete");
    Ok(PhaseOutcome { timings, result })
}

/// Agrees on the run configuration. Root parses and broadcasts the outcome;
/// on a parse failure every rank stops, root with the parse error itself.
fn agree_startup<C, F>(comm: &C, parse: F) -> Result<Startup>
where
    C: Communicator,
    F: FnOnce() -> Result<Startup>,
{
    if comm.is_root() {
        match parse() {
            Ok(startup) => comm.broadcast(Some(startup), ROOT),
            Err(err) => {
                warn!(rank = comm.rank(), error = %err, "configuration rejected, aborting run");
                comm.broadcast(Some(Startup::Abort(err.to_string())), ROOT)?;
                Err(err)
            }
        }
    } else {
        match comm.broadcast::<Startup>(None, ROOT)? {
            Startup::Abort(reason) => Err(DistMulError::Aborted(reason)),
            startup => Ok(startup),
        }
    }
}

fn run_phases<P: ComputeParticipant>(
    participant: &mut P,
    representations: &[Representation],
    schedule: &Schedule,
) -> Result<Vec<(Representation, PhaseOutcome)>> {
    let rank = participant.comm().rank();
    let mut outcomes = Vec::with_capacity(representations.len());
    for &representation in representations {
        info!(rank, %representation, "starting phase");
        participant.begin_phase(representation);
        outcomes.push((representation, execute(participant, schedule)?));
    }
    Ok(outcomes)
}

/// Runs the matrix-vector benchmark with an already agreed configuration.
/// Returns the report on root and `None` on workers.
pub fn run_matrix<C: Communicator>(comm: C, config: &MatrixConfig) -> Result<Option<MatrixReport>> {
    let processes = comm.size();
    let role = Role::select(comm, || {
        let mut rng = generator::seeded_rng(config.seed);
        let matrix = generator::dense_matrix(config.size, config.nonzero_percentage(), &mut rng)?;
        let initial = generator::vector(config.size, &mut rng);
        info!(rank = ROOT, size = config.size, nnz = matrix.nnz(), seed = config.seed, "generated inputs");
        Ok(Workload::Matrix { matrix, initial })
    })?;

    let representations = config.representations();
    let schedule = Schedule::matrix(config.multiplications);

    match role {
        Role::Coordinator(mut coordinator) => {
            let phases = run_phases(&mut coordinator, &representations, &schedule)?;
            let nnz = match coordinator.workload() {
                Workload::Matrix { matrix, .. } => matrix.nnz(),
                Workload::Polynomial(_) => 0,
            };
            let report = MatrixReport {
                processes,
                size: config.size,
                nnz,
                multiplications: config.multiplications,
                dump_len: config.dump_len,
                csv: config.csv,
                phases: phases
                    .into_iter()
                    .map(|(representation, outcome)| PhaseReport {
                        representation,
                        timings: outcome.timings,
                        result: outcome.result.unwrap_or_default(),
                    })
                    .collect(),
            };
            if report.results_match() == Some(false) {
                warn!(rank = ROOT, "CSR and dense results differ");
            }
            Ok(Some(report))
        }
        Role::Worker(mut worker) => {
            run_phases(&mut worker, &representations, &schedule)?;
            Ok(None)
        }
    }
}

/// Runs the polynomial benchmark with an already agreed configuration.
pub fn run_polynomial<C: Communicator>(
    comm: C,
    config: &PolynomialConfig,
) -> Result<Option<PolynomialReport>> {
    let processes = comm.size();
    let role = Role::select(comm, || {
        let mut rng = generator::seeded_rng(config.seed);
        let pair = generator::polynomial_pair(config.grade, &mut rng);
        info!(rank = ROOT, grade = config.grade, seed = config.seed, "generated inputs");
        Ok(Workload::Polynomial(pair))
    })?;
    let schedule = Schedule::polynomial();

    match role {
        Role::Coordinator(mut coordinator) => {
            coordinator.begin_phase(Representation::Dense);
            let outcome = execute(&mut coordinator, &schedule)?;
            let product = Polynomial::new(outcome.result.unwrap_or_default());

            let pair = match coordinator.workload() {
                Workload::Polynomial(pair) => pair.clone(),
                Workload::Matrix { .. } => {
                    return Err(DistMulError::InvalidParameters(
                        "polynomial run without polynomial operands".to_string(),
                    ))
                }
            };
            let reference_match = if config.verify {
                let expected = reference::polynomial_product(&pair);
                let matches = expected == product.coefficients;
                info!(rank = ROOT, matches, "reference check");
                Some(matches)
            } else {
                None
            };

            Ok(Some(PolynomialReport {
                processes,
                grade: config.grade,
                timings: outcome.timings,
                product,
                inputs: config.print.then_some(pair),
                reference_match,
                csv: config.csv,
            }))
        }
        Role::Worker(mut worker) => {
            execute(&mut worker, &schedule)?;
            Ok(None)
        }
    }
}

/// Full matrix-vector program on one rank: `parse` runs on root only.
pub fn run_matrix_benchmark<C, F>(comm: C, parse: F) -> Result<Option<MatrixReport>>
where
    C: Communicator,
    F: FnOnce() -> Result<MatrixConfig>,
{
    match agree_startup(&comm, || parse().map(Startup::Matrix))? {
        Startup::Matrix(config) => run_matrix(comm, &config),
        other => Err(DistMulError::InvalidParameters(format!(
            "expected matrix configuration, got {other:?}"
        ))),
    }
}

/// Full polynomial program on one rank: `parse` runs on root only.
pub fn run_polynomial_benchmark<C, F>(comm: C, parse: F) -> Result<Option<PolynomialReport>>
where
    C: Communicator,
    F: FnOnce() -> Result<PolynomialConfig>,
{
    match agree_startup(&comm, || parse().map(Startup::Polynomial))? {
        Startup::Polynomial(config) => run_polynomial(comm, &config),
        other => Err(DistMulError::InvalidParameters(format!(
            "expected polynomial configuration, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalGroup;
    use crate::matrix::DenseMatrix;
    use crate::participant::{Coordinator, Worker};

    #[test]
    fn test_execute_single_round() {
        let matrix = DenseMatrix::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap();
        let outcomes = LocalGroup::run(2, |comm| {
            if comm.is_root() {
                let workload = Workload::Matrix {
                    matrix: matrix.clone(),
                    initial: vec![1, 1],
                };
                let mut coordinator = Coordinator::new(comm, workload)?;
                coordinator.begin_phase(Representation::Dense);
                execute(&mut coordinator, &Schedule::matrix(1))
            } else {
                execute(&mut Worker::new(comm)?, &Schedule::matrix(1))
            }
        })
        .unwrap();

        assert_eq!(outcomes[0].result, Some(vec![3, 7]));
        assert!(outcomes[0].timings.slowest_compute.is_some());
        assert_eq!(outcomes[1].result, None);
        assert_eq!(outcomes[1].timings.slowest_compute, None);
    }

    #[test]
    fn test_zero_rounds_keep_initial_vector() {
        let mut config = MatrixConfig::new(5, 40, 1).unwrap();
        config.multiplications = 0;
        let reports = LocalGroup::run(3, |comm| run_matrix(comm, &config)).unwrap();

        let mut rng = generator::seeded_rng(config.seed);
        let matrix = generator::dense_matrix(5, 60, &mut rng).unwrap();
        let initial = generator::vector(5, &mut rng);

        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.phases.len(), 2);
        for phase in &report.phases {
            assert_eq!(phase.result, reference::iterate(&matrix, &initial, 0));
        }
        assert_eq!(report.results_match(), Some(true));
    }

    #[test]
    fn test_polynomial_benchmark_verifies() {
        let reports = LocalGroup::run(3, |comm| {
            run_polynomial_benchmark(comm, || {
                let mut config = PolynomialConfig::new(6);
                config.verify = true;
                config.print = true;
                Ok(config)
            })
        })
        .unwrap();

        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.reference_match, Some(true));
        assert_eq!(report.product.len(), 13);
        assert!(report.inputs.is_some());
        assert!(reports[1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_parse_failure_reaches_every_rank() {
        let err = LocalGroup::run(3, |comm| {
            run_matrix_benchmark(comm, || MatrixConfig::parse(&["-s", "4"]))
        })
        .unwrap_err();
        assert!(matches!(err, DistMulError::MissingArgument("-z")));
    }
}
