use distmul::config::{self, MatrixConfig};
use distmul::{logging, run_matrix_benchmark, MatrixReport, Result};
use std::env;
use std::process::ExitCode;

#[cfg(not(feature = "mpi"))]
fn launch<F>(parse: F) -> Result<Option<MatrixReport>>
where
    F: Fn() -> Result<MatrixConfig> + Sync,
{
    let processes = config::processes_from_env()?;
    let reports = distmul::LocalGroup::run(processes, |comm| run_matrix_benchmark(comm, &parse))?;
    Ok(reports.into_iter().next().flatten())
}

#[cfg(feature = "mpi")]
fn launch<F>(parse: F) -> Result<Option<MatrixReport>>
where
    F: Fn() -> Result<MatrixConfig> + Sync,
{
    run_matrix_benchmark(distmul::MpiComm::initialize()?, parse)
}

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("matvec", String::as_str);
    let flags = args.get(1..).unwrap_or_default();

    let parse = || -> Result<MatrixConfig> {
        Ok(MatrixConfig::parse(flags)?.with_seed(config::seed_from_env()?))
    };

    match launch(parse) {
        Ok(Some(report)) => {
            print!("{report}");
            if report.csv {
                println!("{}", MatrixReport::csv_header());
                for row in report.csv_rows() {
                    println!("{row}");
                }
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_usage() {
                eprintln!("{}", MatrixConfig::usage(program));
            }
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
