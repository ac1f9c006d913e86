use distmul::config::{self, PolynomialConfig};
use distmul::{logging, run_polynomial_benchmark, PolynomialReport, Result};
use std::env;
use std::process::ExitCode;

#[cfg(not(feature = "mpi"))]
fn launch<F>(parse: F) -> Result<Option<PolynomialReport>>
where
    F: Fn() -> Result<PolynomialConfig> + Sync,
{
    let processes = config::processes_from_env()?;
    let reports = distmul::LocalGroup::run(processes, |comm| run_polynomial_benchmark(comm, &parse))?;
    Ok(reports.into_iter().next().flatten())
}

#[cfg(feature = "mpi")]
fn launch<F>(parse: F) -> Result<Option<PolynomialReport>>
where
    F: Fn() -> Result<PolynomialConfig> + Sync,
{
    run_polynomial_benchmark(distmul::MpiComm::initialize()?, parse)
}

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("polymul", String::as_str);
    let flags = args.get(1..).unwrap_or_default();

    let parse = || -> Result<PolynomialConfig> {
        Ok(PolynomialConfig::parse(flags)?.with_seed(config::seed_from_env()?))
    };

    match launch(parse) {
        Ok(Some(report)) => {
            if report.csv {
                println!("{}", PolynomialReport::csv_header());
                println!("{}", report.csv_row());
            } else {
                print!("{report}");
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_usage() {
                eprintln!("{}", PolynomialConfig::usage(program));
            }
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
