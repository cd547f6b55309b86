//! Argument parsing and command execution for the engawa CLI.
//!
//! The CLI loads a delimited numeric dataset, runs the clustering engine,
//! optionally writes the hierarchy dump and its visualization sidecar, and
//! renders a run summary to stdout.

use std::{
    fmt::Write as _,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use thiserror::Error;
use tracing::{info, instrument};

use engawa_core::{
    DatasetView, ElementBuffer, EngawaBuilder, EngawaError, Hierarchy, analyse_stats,
    calculate_stats, create_cluster_map, min_max_distances,
};

/// Hierarchical density-based clustering over numeric datasets.
#[derive(Debug, Parser)]
#[command(name = "engawa", version, about)]
pub struct Cli {
    /// Path to a delimited numeric dataset; one point per row.
    pub dataset: PathBuf,

    /// Minimum number of points required to form a cluster.
    #[arg(long, short = 'm', default_value_t = 5)]
    pub min_points: usize,

    /// Prefix for the hierarchy dump and visualization sidecar.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Compute distance statistics and the clustering validity score.
    #[arg(long)]
    pub stats: bool,
}

/// Errors raised while executing a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The dataset file could not be read.
    #[error("failed to read dataset `{path}`: {source}")]
    DatasetIo {
        /// Path of the dataset file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A dataset cell could not be parsed as a number.
    #[error("dataset line {line}: could not parse `{value}` as a number")]
    DatasetParse {
        /// One-based line number of the offending row.
        line: usize,
        /// The cell that failed to parse.
        value: String,
    },
    /// A dataset row had a different width from the first row.
    #[error("dataset line {line} has {got} columns, expected {expected}")]
    RaggedRow {
        /// One-based line number of the offending row.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
    },
    /// The dataset contained no rows.
    #[error("dataset contains no rows")]
    EmptyDataset,
    /// The clustering engine reported an error.
    #[error(transparent)]
    Core(#[from] EngawaError),
    /// An output file could not be written.
    #[error("failed to write `{path}`: {source}")]
    OutputIo {
        /// Path of the output file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Figures rendered after a successful run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Summary {
    /// Number of points clustered.
    pub points: usize,
    /// Number of non-noise clusters in the flat partition.
    pub clusters: usize,
    /// Number of points labelled noise.
    pub noise: usize,
    /// Number of recorded hierarchy levels.
    pub levels: usize,
    /// Whether any cluster accumulated infinite stability.
    pub infinite_stability: bool,
    /// Clustering validity score, when `--stats` was requested.
    pub validity: Option<i32>,
}

/// Executes the parsed command and returns the run summary.
///
/// # Errors
/// Returns [`CliError`] when the dataset cannot be loaded or parsed, the
/// engine rejects the input, or an output file cannot be written.
#[instrument(name = "cli.run", err, skip(cli), fields(dataset = %cli.dataset.display()))]
pub fn run_cli(cli: Cli) -> Result<Summary, CliError> {
    let raw = fs::read_to_string(&cli.dataset).map_err(|source| CliError::DatasetIo {
        path: cli.dataset.clone(),
        source,
    })?;
    let (values, rows, cols) = parse_rows(&raw)?;
    info!(rows, cols, "dataset loaded");

    let view = DatasetView::new(ElementBuffer::F64(&values), rows, cols, true)
        .map_err(|error| CliError::Core(error.into()))?;
    let mut engine = EngawaBuilder::new().with_min_points(cli.min_points).build()?;
    let run = engine.run(&view)?;

    let hierarchy = engine.hierarchy()?;
    if let Some(prefix) = &cli.output {
        write_hierarchy(prefix, hierarchy)?;
    }
    let levels = hierarchy.len();

    let mut validity = None;
    if cli.stats {
        let labels = engine.labels()?;
        let cluster_map = create_cluster_map(labels, 0, labels.len());
        let mut distance_map = min_max_distances(engine.distances()?, &cluster_map);
        let stats = calculate_stats(&mut distance_map);
        validity = Some(analyse_stats(&stats));
    }

    Ok(Summary {
        points: run.num_points(),
        clusters: run.num_clusters(),
        noise: run.num_noise(),
        levels,
        infinite_stability: run.infinite_stability(),
        validity,
    })
}

/// Parses a delimited numeric dataset: one row per line, cells separated by
/// commas or whitespace. Blank lines are skipped.
fn parse_rows(raw: &str) -> Result<(Vec<f64>, usize, usize), CliError> {
    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols = 0;

    for (index, line) in raw.lines().enumerate() {
        let cells: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|cell| !cell.is_empty())
            .collect();
        if cells.is_empty() {
            continue;
        }
        if cols == 0 {
            cols = cells.len();
        } else if cells.len() != cols {
            return Err(CliError::RaggedRow {
                line: index + 1,
                expected: cols,
                got: cells.len(),
            });
        }
        for cell in cells {
            let value = cell.parse::<f64>().map_err(|_| CliError::DatasetParse {
                line: index + 1,
                value: cell.to_owned(),
            })?;
            values.push(value);
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(CliError::EmptyDataset);
    }
    Ok((values, rows, cols))
}

/// Formats the hierarchy dump: one line per level in ascending key order,
/// `<edgeWeight>,<label0>,...,<labelN-1>`.
fn format_hierarchy(hierarchy: &Hierarchy) -> String {
    let mut dump = String::new();
    for entry in hierarchy.values() {
        let _ = write!(dump, "{:.15}", entry.edge_weight());
        for label in entry.labels() {
            let _ = write!(dump, ",{label}");
        }
        dump.push('\n');
    }
    dump
}

fn append_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_hierarchy(prefix: &Path, hierarchy: &Hierarchy) -> Result<(), CliError> {
    let csv_path = append_suffix(prefix, "_hierarchy.csv");
    fs::write(&csv_path, format_hierarchy(hierarchy)).map_err(|source| CliError::OutputIo {
        path: csv_path.clone(),
        source,
    })?;

    let vis_path = append_suffix(prefix, "_visualization.vis");
    fs::write(&vis_path, format!("1\n{}\n", hierarchy.len())).map_err(|source| {
        CliError::OutputIo {
            path: vis_path.clone(),
            source,
        }
    })?;
    Ok(())
}

/// Renders the run summary to the provided writer.
///
/// # Errors
/// Propagates any I/O failure from the writer.
pub fn render_summary<W: Write>(summary: &Summary, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "points    : {}", summary.points)?;
    writeln!(writer, "clusters  : {}", summary.clusters)?;
    writeln!(writer, "noise     : {}", summary.noise)?;
    writeln!(writer, "levels    : {}", summary.levels)?;
    if summary.infinite_stability {
        writeln!(writer, "warning   : infinite stability detected")?;
    }
    if let Some(validity) = summary.validity {
        writeln!(writer, "validity  : {validity}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engawa_core::HierarchyEntry;
    use rstest::rstest;

    #[test]
    fn parses_comma_and_whitespace_delimited_rows() {
        let (values, rows, cols) = parse_rows("1.0,2.0\n3.0 4.0\n\n5.0,6.0\n").expect("must parse");
        assert_eq!(rows, 3);
        assert_eq!(cols, 2);
        assert_eq!(values, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[rstest]
    #[case("1.0,2.0\n3.0\n")]
    #[case("1.0\n2.0,3.0\n")]
    fn rejects_ragged_rows(#[case] raw: &str) {
        let err = parse_rows(raw).expect_err("ragged input must fail");
        assert!(matches!(err, CliError::RaggedRow { .. }));
    }

    #[test]
    fn rejects_unparseable_cells() {
        let err = parse_rows("1.0,two\n").expect_err("non-numeric input must fail");
        assert!(matches!(
            err,
            CliError::DatasetParse { line: 1, .. }
        ));
    }

    #[test]
    fn rejects_empty_input() {
        let err = parse_rows("\n\n").expect_err("empty input must fail");
        assert!(matches!(err, CliError::EmptyDataset));
    }

    #[test]
    fn hierarchy_dump_lists_levels_in_key_order() {
        let mut hierarchy = Hierarchy::new();
        hierarchy.insert(1, HierarchyEntry::new(2.5, vec![1, 1, 1]));
        hierarchy.insert(2, HierarchyEntry::new(1.0, vec![2, 2, 0]));
        hierarchy.insert(0, HierarchyEntry::new(0.0, vec![0, 0, 0]));

        let dump = format_hierarchy(&hierarchy);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("0.000000000000000,0,0,0"));
        assert!(lines[1].starts_with("2.500000000000000,1,1,1"));
        assert!(lines[2].starts_with("1.000000000000000,2,2,0"));
    }

    #[test]
    fn summary_renders_one_line_per_figure() {
        let summary = Summary {
            points: 6,
            clusters: 2,
            noise: 0,
            levels: 3,
            infinite_stability: false,
            validity: Some(3),
        };
        let mut out = Vec::new();
        render_summary(&summary, &mut out).expect("render must succeed");
        let text = String::from_utf8(out).expect("utf-8 output");
        assert!(text.contains("points    : 6"));
        assert!(text.contains("clusters  : 2"));
        assert!(text.contains("validity  : 3"));
        assert!(!text.contains("warning"));
    }

    #[test]
    fn end_to_end_run_writes_the_dump_and_sidecar() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dataset_path = dir.path().join("points.csv");
        fs::write(&dataset_path, "0.0\n1.0\n2.0\n100.0\n101.0\n102.0\n").expect("write dataset");
        let prefix = dir.path().join("run");

        let summary = run_cli(Cli {
            dataset: dataset_path,
            min_points: 2,
            output: Some(prefix.clone()),
            stats: true,
        })
        .expect("run must succeed");

        assert_eq!(summary.points, 6);
        assert_eq!(summary.clusters, 2);
        assert_eq!(summary.noise, 0);
        assert!(summary.validity.is_some());

        let dump = fs::read_to_string(append_suffix(&prefix, "_hierarchy.csv"))
            .expect("dump must exist");
        assert_eq!(dump.lines().count(), summary.levels);

        let sidecar = fs::read_to_string(append_suffix(&prefix, "_visualization.vis"))
            .expect("sidecar must exist");
        assert_eq!(sidecar, format!("1\n{}\n", summary.levels));
    }
}
