//! Timing and result records returned by the drivers, and their console form.

use crate::kernel::Representation;
use crate::polynomial::{Polynomial, PolynomialPair};
use std::fmt;
use std::time::Duration;

/// Wall-clock breakdown of one phase on one participant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseTimings {
    /// Building the operand representation on root (CSR conversion).
    pub construction: Duration,
    /// Size and operand broadcasts.
    pub broadcast: Duration,
    /// Per-round vector broadcasts.
    pub vector_broadcast: Duration,
    /// Time spent inside the local kernel.
    pub local_compute: Duration,
    /// Time spent in reduce-sum.
    pub reduce: Duration,
    /// All rounds, from the first round step to the last adopt.
    pub rounds: Duration,
    /// Slowest participant's local compute time; root only.
    pub slowest_compute: Option<Duration>,
    /// Whole phase including construction.
    pub total: Duration,
}

/// Outcome of one phase as seen by root.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseReport {
    pub representation: Representation,
    pub timings: PhaseTimings,
    pub result: Vec<i64>,
}

/// Root's view of a matrix-vector run.
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixReport {
    pub processes: usize,
    pub size: usize,
    pub nnz: usize,
    pub multiplications: usize,
    pub dump_len: usize,
    /// Whether the caller asked for CSV rows after the report.
    pub csv: bool,
    pub phases: Vec<PhaseReport>,
}

impl MatrixReport {
    pub fn phase(&self, representation: Representation) -> Option<&PhaseReport> {
        self.phases
            .iter()
            .find(|phase| phase.representation == representation)
    }

    /// Whether the CSR and dense runs agree; `None` when only one ran.
    pub fn results_match(&self) -> Option<bool> {
        let sparse = self.phase(Representation::Sparse)?;
        let dense = self.phase(Representation::Dense)?;
        Some(sparse.result == dense.result)
    }

    pub fn csv_header() -> &'static str {
        "Processes,Size,NNZ,Multiplications,Representation,Construction time,Broadcast time,Compute time,Total time"
    }

    pub fn csv_rows(&self) -> Vec<String> {
        self.phases
            .iter()
            .map(|phase| {
                format!(
                    "{},{},{},{},{},{:.6},{:.6},{:.6},{:.6}",
                    self.processes,
                    self.size,
                    self.nnz,
                    self.multiplications,
                    phase.representation,
                    phase.timings.construction.as_secs_f64(),
                    phase.timings.broadcast.as_secs_f64(),
                    phase.timings.rounds.as_secs_f64(),
                    phase.timings.total.as_secs_f64(),
                )
            })
            .collect()
    }
}

fn write_prefix(f: &mut fmt::Formatter<'_>, values: &[i64], len: usize) -> fmt::Result {
    for value in values.iter().take(len) {
        write!(f, "{value} ")?;
    }
    writeln!(f)
}

impl fmt::Display for MatrixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Timing Results ===")?;
        for phase in &self.phases {
            let t = &phase.timings;
            let name = phase.representation;
            if phase.representation == Representation::Sparse {
                writeln!(f, "CSR construction time: {:.6}", t.construction.as_secs_f64())?;
            }
            writeln!(f, "Broadcast time ({name}): {:.6}", t.broadcast.as_secs_f64())?;
            writeln!(f, "Vector broadcast time ({name}): {:.6}", t.vector_broadcast.as_secs_f64())?;
            writeln!(f, "Local compute time ({name}): {:.6}", t.local_compute.as_secs_f64())?;
            if let Some(slowest) = t.slowest_compute {
                writeln!(f, "Slowest local compute ({name}): {:.6}", slowest.as_secs_f64())?;
            }
            writeln!(f, "Reduce time ({name}): {:.6}", t.reduce.as_secs_f64())?;
            writeln!(f, "Compute time ({name}): {:.6}", t.rounds.as_secs_f64())?;
            writeln!(f, "Total time ({name}): {:.6}", t.total.as_secs_f64())?;
        }

        writeln!(f)?;
        writeln!(f, "=== Result Vectors ===")?;
        for phase in &self.phases {
            writeln!(
                f,
                "{} Result Vector (first {} elements):",
                phase.representation,
                self.dump_len.min(phase.result.len())
            )?;
            write_prefix(f, &phase.result, self.dump_len)?;
            writeln!(f)?;
        }

        if let Some(matches) = self.results_match() {
            writeln!(f, "Results match: {}", if matches { "YES" } else { "NO" })?;
        }
        Ok(())
    }
}

/// Root's view of a polynomial run.
#[derive(Clone, Debug, PartialEq)]
pub struct PolynomialReport {
    pub processes: usize,
    pub grade: usize,
    pub timings: PhaseTimings,
    pub product: Polynomial,
    /// Operands, kept when the caller asked to print them.
    pub inputs: Option<PolynomialPair>,
    /// Outcome of the single-process reference check, when requested.
    pub reference_match: Option<bool>,
    pub csv: bool,
}

impl PolynomialReport {
    pub fn csv_header() -> &'static str {
        "Processes,Grade,Broadcast time,Compute time,Reduce Time,Total time"
    }

    pub fn csv_row(&self) -> String {
        let t = &self.timings;
        format!(
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            self.processes,
            self.grade,
            t.broadcast.as_secs_f64(),
            t.slowest_compute.unwrap_or(t.local_compute).as_secs_f64(),
            t.reduce.as_secs_f64(),
            t.total.as_secs_f64(),
        )
    }
}

impl fmt::Display for PolynomialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(inputs) = &self.inputs {
            writeln!(f, "A: {}", inputs.a)?;
            writeln!(f, "B: {}", inputs.b)?;
            writeln!(f, "C: {}", self.product)?;
        }

        let t = &self.timings;
        writeln!(f, "Broadcast time: {:.6}", t.broadcast.as_secs_f64())?;
        writeln!(
            f,
            "Compute time: {:.6}",
            t.slowest_compute.unwrap_or(t.local_compute).as_secs_f64()
        )?;
        writeln!(f, "Reduce time: {:.6}", t.reduce.as_secs_f64())?;
        writeln!(f, "Total time: {:.6}", t.total.as_secs_f64())?;

        if let Some(matches) = self.reference_match {
            writeln!(f, "Results match: {}", if matches { "YES" } else { "NO" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(representation: Representation, result: Vec<i64>) -> PhaseReport {
        PhaseReport {
            representation,
            timings: PhaseTimings::default(),
            result,
        }
    }

    #[test]
    fn test_results_match_verdict() {
        let mut report = MatrixReport {
            processes: 2,
            size: 3,
            nnz: 4,
            multiplications: 1,
            dump_len: 2,
            csv: false,
            phases: vec![
                phase(Representation::Sparse, vec![1, 2, 3]),
                phase(Representation::Dense, vec![1, 2, 3]),
            ],
        };
        assert_eq!(report.results_match(), Some(true));
        let text = report.to_string();
        assert!(text.contains("Results match: YES"));
        assert!(text.contains("CSR Result Vector (first 2 elements):\n1 2 \n"));

        report.phases[1].result[2] = 4;
        assert!(report.to_string().contains("Results match: NO"));

        report.phases.remove(0);
        assert_eq!(report.results_match(), None);
        assert!(!report.to_string().contains("Results match"));
        assert_eq!(report.csv_rows().len(), 1);
    }

    #[test]
    fn test_polynomial_csv_row() {
        let report = PolynomialReport {
            processes: 4,
            grade: 10,
            timings: PhaseTimings {
                broadcast: Duration::from_millis(5),
                slowest_compute: Some(Duration::from_millis(20)),
                ..PhaseTimings::default()
            },
            product: Polynomial::zero(20),
            inputs: None,
            reference_match: Some(true),
            csv: true,
        };
        assert_eq!(report.csv_row(), "4,10,0.005000,0.020000,0.000000,0.000000");
        assert_eq!(PolynomialReport::csv_header().split(',').count(), 6);
        assert!(report.to_string().ends_with("Results match: YES\n"));
    }
}
