//! Solve command - estimate a transform from a points file and report the fit.

use std::path::PathBuf;

use geoanchor::solver::{solve_transform_detailed, SolveReport};
use geoanchor::SessionError;

use super::common::{read_points, SolveOptions};
use crate::error::CliError;

/// Arguments for the solve command.
pub struct SolveArgs {
    pub points: PathBuf,
    pub solve: SolveOptions,
}

/// Run the solve command.
pub fn run(args: SolveArgs) -> Result<(), CliError> {
    let pairs = read_points(&args.points)?;
    let report = solve_transform_detailed(&pairs.source, &pairs.mosaic, &args.solve.ransac_config())
        .map_err(SessionError::from)?;

    print!("{}", format_report(&report, &pairs.source, &pairs.mosaic));
    Ok(())
}

fn format_report(report: &SolveReport, source: &[(f64, f64)], mosaic: &[(f64, f64)]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Strategy: {:?} ({} iterations)\n",
        report.strategy, report.iterations
    ));
    out.push_str("Homography:\n");
    for row in report.homography.as_rows() {
        out.push_str(&format!(
            "  [{:>14.8} {:>14.8} {:>14.8}]\n",
            row[0], row[1], row[2]
        ));
    }

    out.push_str(&format!(
        "\n{:>3}  {:>20}  {:>20}  {:>10}\n",
        "#", "source", "mosaic", "residual"
    ));
    for (i, ((s, d), (residual, inlier))) in source
        .iter()
        .zip(mosaic)
        .zip(report.residuals.iter().zip(&report.inliers))
        .enumerate()
    {
        out.push_str(&format!(
            "{:>3}  {:>20}  {:>20}  {:>10.3}{}\n",
            i + 1,
            format!("({:.1}, {:.1})", s.0, s.1),
            format!("({:.1}, {:.1})", d.0, d.1),
            residual,
            if *inlier { "" } else { "  outlier" }
        ));
    }

    out.push_str(&format!(
        "\nInliers: {} of {}, RMS error {:.3} px\n",
        report.inlier_count(),
        source.len(),
        report.rms_error
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoanchor::solver::RansacConfig;

    #[test]
    fn test_report_marks_outliers() {
        let src = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0), (50.0, 40.0)];
        let mut dst: Vec<(f64, f64)> = src.iter().map(|&(x, y)| (x + 5.0, y + 7.0)).collect();
        dst[4] = (400.0, 400.0);

        let report = solve_transform_detailed(&src, &dst, &RansacConfig::default()).unwrap();
        let text = format_report(&report, &src, &dst);

        assert!(text.contains("Ransac"));
        assert!(text.contains("Inliers: 4 of 5"));
        assert_eq!(text.matches("outlier").count(), 1);
    }
}
