use crate::generator::{self, seeded_rng};
use crate::*;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Regenerates the inputs root builds for `config`.
fn matrix_inputs(config: &MatrixConfig) -> (DenseMatrix, Vec<i64>) {
    let mut rng = seeded_rng(config.seed);
    let matrix = generator::dense_matrix(config.size, config.nonzero_percentage(), &mut rng).unwrap();
    let vector = generator::vector(config.size, &mut rng);
    (matrix, vector)
}

#[test]
fn test_small_sparse_run_matches_dense() {
    let config = MatrixConfig::new(4, 50, 3).unwrap();
    let report = matrix_in_process(2, &config).unwrap();

    assert_eq!(report.phases.len(), 2);
    assert_eq!(report.nnz, 8);
    assert_eq!(report.results_match(), Some(true));

    let (matrix, vector) = matrix_inputs(&config);
    let expected = reference::iterate(&matrix, &vector, 3);
    for phase in &report.phases {
        assert_eq!(phase.result, expected, "{} phase", phase.representation);
    }
    assert!(report.to_string().contains("Results match: YES"));
}

#[test]
fn test_more_workers_than_rows() {
    let config = MatrixConfig::new(2, 0, 2).unwrap();
    let report = matrix_in_process(5, &config).unwrap();

    let (matrix, vector) = matrix_inputs(&config);
    assert_eq!(
        report.phase(Representation::Sparse).unwrap().result,
        reference::iterate(&matrix, &vector, 2)
    );
    assert_eq!(report.results_match(), Some(true));
}

#[test]
fn test_dense_only_run() {
    let mut config = MatrixConfig::new(6, 30, 1).unwrap();
    config.dense_only = true;
    let report = matrix_in_process(3, &config).unwrap();

    assert_eq!(report.phases.len(), 1);
    assert_eq!(report.phases[0].representation, Representation::Dense);
    assert_eq!(report.results_match(), None);
    assert_eq!(report.csv_rows().len(), 1);
}

#[test]
fn test_all_zero_matrix() {
    let config = MatrixConfig::new(5, 100, 2).unwrap();
    let report = matrix_in_process(2, &config).unwrap();
    assert_eq!(report.nnz, 0);
    for phase in &report.phases {
        assert!(phase.result.iter().all(|&x| x == 0));
    }
}

#[test]
fn test_seed_changes_inputs() {
    let base = MatrixConfig::new(8, 40, 1).unwrap();
    let a = matrix_in_process(2, &base).unwrap();
    let b = matrix_in_process(2, &base.clone().with_seed(1)).unwrap();
    let again = matrix_in_process(3, &base).unwrap();

    assert_ne!(a.phases[0].result, b.phases[0].result);
    assert_eq!(a.phases[0].result, again.phases[0].result);
}

#[test]
fn test_polynomial_matches_reference() {
    for processes in [1, 2, 4, 7] {
        let config = PolynomialConfig::new(9);
        let report = polynomial_in_process(processes, &config).unwrap();
        let pair = generator::polynomial_pair(9, &mut seeded_rng(config.seed));
        assert_eq!(report.product.coefficients, reference::schoolbook_scatter(&pair));
        assert_eq!(report.product.grade(), 18);
    }
}

#[test]
fn test_polynomial_grade_zero_on_many_ranks() {
    let report = polynomial_in_process(4, &PolynomialConfig::new(0)).unwrap();
    let pair = generator::polynomial_pair(0, &mut seeded_rng(generator::DEFAULT_SEED));
    assert_eq!(
        report.product.coefficients,
        vec![pair.a.coefficients[0] * pair.b.coefficients[0]]
    );
}

#[test]
fn test_config_abort_stops_every_rank() {
    let outcomes = LocalGroup::run(4, |comm| {
        Ok(run_polynomial_benchmark(comm, || PolynomialConfig::parse(&["-n", "5", "-x"])).map(|_| ()))
    })
    .unwrap();

    assert!(matches!(outcomes[0], Err(DistMulError::UnknownFlag(_))));
    for outcome in &outcomes[1..] {
        assert!(matches!(outcome, Err(DistMulError::Aborted(reason)) if reason.contains("-x")));
    }
}

#[test]
fn test_oversized_matrix_aborts_every_rank() {
    let huge = (1usize << (usize::BITS / 2)).to_string();
    let outcomes = LocalGroup::run(3, |comm| {
        Ok(run_matrix_benchmark(comm, || {
            MatrixConfig::parse(&["-s", huge.as_str(), "-z", "50", "-m", "1"])
        })
        .map(|_| ()))
    })
    .unwrap();

    assert!(matches!(outcomes[0], Err(DistMulError::InvalidArgument { flag: "-s", .. })));
    assert!(outcomes[1..]
        .iter()
        .all(|outcome| matches!(outcome, Err(DistMulError::Aborted(_)))));
}

#[test]
fn test_benchmark_entry_point_reports_on_root_only() {
    let reports = LocalGroup::run(3, |comm| {
        run_matrix_benchmark(comm, || MatrixConfig::parse(&["-s", "5", "-z", "20", "-m", "2", "-v", "3"]))
    })
    .unwrap();

    let root = reports[0].as_ref().unwrap();
    assert_eq!(root.processes, 3);
    assert_eq!(root.dump_len, 3);
    assert!(root.to_string().contains("CSR Result Vector (first 3 elements):"));
    assert!(reports[1].is_none() && reports[2].is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_distributed_iteration_matches_reference(
        size in 1usize..9,
        zero_percentage in 0u32..=100,
        multiplications in 1usize..4,
        processes in 1usize..6,
        seed in any::<u64>(),
    ) {
        let config = MatrixConfig::new(size, zero_percentage, multiplications)
            .unwrap()
            .with_seed(seed);
        let report = matrix_in_process(processes, &config).unwrap();
        let (matrix, vector) = matrix_inputs(&config);
        let expected = reference::iterate(&matrix, &vector, multiplications);

        prop_assert_eq!(report.results_match(), Some(true));
        prop_assert_eq!(&report.phases[0].result, &expected);
    }

    #[test]
    fn prop_csr_kernel_matches_dense(size in 1usize..12, seed in any::<u64>(), workers in 1usize..5) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let matrix = generator::dense_matrix(size, rng.gen_range(0..=100), &mut rng).unwrap();
        let vector: Vec<i64> = (0..size).map(|_| rng.gen()).collect();
        let csr = matrix.to_csr();

        let mut dense_out = vec![0; size];
        let mut csr_out = vec![0; size];
        for part in partitions(size, workers).unwrap() {
            kernel::dense_rows(&matrix, &vector, &part, &mut dense_out).unwrap();
            kernel::csr_rows(&csr, &vector, &part, &mut csr_out).unwrap();
        }
        prop_assert_eq!(dense_out, csr_out);
    }

    #[test]
    fn prop_reduce_sum_is_wrapping_sum(
        partials in prop::collection::vec(prop::collection::vec(any::<i64>(), 4), 1..5),
    ) {
        let expected = partials.iter().fold(vec![0i64; 4], |acc, p| {
            acc.iter().zip(p).map(|(a, b)| a.wrapping_add(*b)).collect()
        });
        let reduced = LocalGroup::run(partials.len(), |comm| {
            comm.reduce_sum(&partials[comm.rank()], ROOT)
        })
        .unwrap();

        prop_assert_eq!(reduced[0].as_ref(), Some(&expected));
        prop_assert!(reduced[1..].iter().all(Option::is_none));
    }
}
