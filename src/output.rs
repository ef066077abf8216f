//! Rendering of a finished run on stdout.

use anyhow::{Context, Result};
use pftree_core::analysis::TreeStats;
use pftree_core::model::size::format_count;
use pftree_core::RunReport;
use std::io::{self, Write};

use crate::cli::Cli;

/// Print whatever the command line asked for.
pub fn print_report(cli: &Cli, report: &RunReport) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.json {
        serde_json::to_writer_pretty(&mut out, report).context("failed to encode report")?;
        writeln!(out)?;
        return Ok(());
    }

    if let Some(stats) = &report.stats {
        if cli.json_stats {
            serde_json::to_writer_pretty(&mut out, stats).context("failed to encode stats")?;
            writeln!(out)?;
        }
        if cli.csv_stats {
            write_csv(&mut out, stats)?;
        }
        if cli.duf || cli.stats || cli.stats_reverse {
            write_listing(&mut out, stats)?;
        }
        if cli.du || cli.duf || cli.stats || cli.stats_reverse {
            write_summary(&mut out, stats)?;
        }
    }

    if let Some(pipeline) = &report.pipeline {
        writeln!(
            out,
            "processed {} directories: {} files read, {} analysed, {} saved",
            format_count(pipeline.file_sets_processed as u64),
            format_count(pipeline.files_read),
            format_count(pipeline.files_analyzed),
            format_count(pipeline.files_saved)
        )?;
    }

    if cli.print_elapsed_time {
        writeln!(out, "Elapsed time = {:.3} seconds", report.run_time)?;
    }
    Ok(())
}

fn write_listing(out: &mut impl Write, stats: &TreeStats) -> Result<()> {
    for entry in &stats.entries {
        writeln!(
            out,
            "{:>10}  {:>8}  {}",
            entry.size_human,
            format_count(entry.files as u64),
            entry.path.display()
        )?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, stats: &TreeStats) -> Result<()> {
    writeln!(
        out,
        "{:>10}  {:>8}  total in {} directories",
        stats.total_size_human,
        format_count(stats.files as u64),
        format_count(stats.dirs as u64)
    )?;
    Ok(())
}

fn write_csv(out: &mut impl Write, stats: &TreeStats) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in &stats.entries {
        writer.serialize(entry).context("failed to encode CSV row")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pftree_core::analysis::DirStat;
    use std::path::PathBuf;

    fn stats() -> TreeStats {
        TreeStats {
            status: true,
            dirs: 2,
            files: 3,
            total_size: 2048,
            total_size_human: "2.0KiB".into(),
            entries: vec![
                DirStat {
                    files: 1,
                    size: 1024,
                    size_human: "1.0KiB".into(),
                    path: PathBuf::from("a"),
                },
                DirStat {
                    files: 2,
                    size: 1024,
                    size_human: "1.0KiB".into(),
                    path: PathBuf::from("b"),
                },
            ],
        }
    }

    #[test]
    fn csv_has_a_header_and_one_row_per_directory() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &stats()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "files,size,sizeHuman,path");
        assert_eq!(lines[1], "1,1024,1.0KiB,a");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn summary_line_reports_totals() {
        let mut buf = Vec::new();
        write_summary(&mut buf, &stats()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("2.0KiB"));
        assert!(text.ends_with("total in 2 directories\n"));
    }
}
