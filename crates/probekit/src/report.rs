use colored::*;
use prettytable::{color, Attr, Cell, Row, Table};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::output::{ComponentReport, ReportData, Reporter};
use crate::Error;

fn header_cell(text: &str, use_colors: bool) -> Cell {
    if use_colors {
        Cell::new(text)
            .with_style(Attr::Bold)
            .with_style(Attr::ForegroundColor(color::CYAN))
    } else {
        Cell::new(text).with_style(Attr::Bold)
    }
}

pub(crate) fn build_table(component: &ComponentReport, use_colors: bool) -> Table {
    let mut table = Table::new();
    table.add_row(Row::new(
        ReportData::headers()
            .into_iter()
            .map(|header| header_cell(header, use_colors))
            .collect(),
    ));

    for row in &component.rows {
        let dash = || "-".to_string();
        table.add_row(Row::new(vec![
            Cell::new(&row.prefix),
            Cell::new(&row.laps.to_string()),
            Cell::new(&row.value),
            Cell::new(&row.exclusive),
            Cell::new(&row.mean.clone().unwrap_or_else(dash)),
            Cell::new(&row.min.clone().unwrap_or_else(dash)),
            Cell::new(&row.max.clone().unwrap_or_else(dash)),
            Cell::new(&row.stddev.clone().unwrap_or_else(dash)),
        ]));
    }
    table
}

pub(crate) fn display_table(data: &ReportData) {
    let use_colors = std::env::var("NO_COLOR").is_err();

    println!(
        "{}: {:.2?}",
        data.caller_name.yellow().bold(),
        Duration::from_nanos(data.total_elapsed),
    );

    for component in &data.components {
        if component.rows.is_empty() {
            continue;
        }
        if component.description.is_empty() {
            println!("{} {}", "[probekit]".blue().bold(), component.label);
        } else {
            println!(
                "{} {} - {}",
                "[probekit]".blue().bold(),
                component.label,
                component.description
            );
        }
        build_table(component, use_colors).printstd();
    }
}

fn display_no_measurements_message(total_elapsed: Duration, caller_name: &str) {
    let title = format!(
        "\n{} No measurements recorded from {} (Total time: {:.2?})",
        "[probekit]".blue().bold(),
        caller_name.yellow().bold(),
        total_elapsed
    );
    println!("{title}");
    println!();
    println!(
        "To start measuring, add the {} macro to your functions:",
        "#[probekit::measure(WallClock)]".cyan().bold()
    );
    println!();
    println!("  {}", "fn your_function() {".dimmed());
    println!("  {}", "    // your code here".dimmed());
    println!("  {}", "}".dimmed());
    println!();
    println!(
        "Or use {} to measure code blocks:",
        "probekit::auto_tuple!".cyan().bold()
    );
    println!();
    println!(
        "  {}",
        "let _guard = probekit::auto_tuple!((WallClock,), \"label\");".cyan()
    );
    println!();
}

pub(crate) struct TableReporter;

impl Reporter for TableReporter {
    fn report(&self, data: &ReportData) -> crate::Result<()> {
        if data.is_empty() {
            display_no_measurements_message(
                Duration::from_nanos(data.total_elapsed),
                &data.caller_name,
            );
            return Ok(());
        }

        display_table(data);
        Ok(())
    }
}

pub(crate) struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, data: &ReportData) -> crate::Result<()> {
        if data.is_empty() {
            display_no_measurements_message(Duration::ZERO, &data.caller_name);
            return Ok(());
        }

        println!("{}", serde_json::to_string(data)?);
        Ok(())
    }
}

pub(crate) struct JsonPrettyReporter;

impl Reporter for JsonPrettyReporter {
    fn report(&self, data: &ReportData) -> crate::Result<()> {
        if data.is_empty() {
            display_no_measurements_message(Duration::ZERO, &data.caller_name);
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(data)?);
        Ok(())
    }
}

/// Writes the report as pretty JSON to a file.
pub struct JsonFileReporter {
    path: PathBuf,
}

impl JsonFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonFileReporter {
    fn report(&self, data: &ReportData) -> crate::Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.write_all(b"\n")?;
        writer.flush().map_err(|err| Error::Reporter {
            reporter: "json-file",
            message: format!("{}: {}", self.path.display(), err),
        })?;
        tracing::debug!(path = %self.path.display(), "wrote json report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ReportRow;

    fn sample() -> ReportData {
        ReportData {
            caller_name: "tests".into(),
            total_elapsed: 1_000,
            components: vec![ComponentReport {
                label: "wall_clock".into(),
                description: "wall time".into(),
                units: "ns".into(),
                rows: vec![ReportRow {
                    prefix: "main".into(),
                    depth: 1,
                    hash: 1,
                    laps: 2,
                    value: "10 ns".into(),
                    exclusive: "4 ns".into(),
                    mean: Some("5.000 ns".into()),
                    min: Some("4.000 ns".into()),
                    max: Some("6.000 ns".into()),
                    stddev: None,
                    raw: serde_json::json!(10),
                }],
            }],
        }
    }

    #[test]
    fn table_has_header_and_rows() {
        let data = sample();
        let table = build_table(&data.components[0], false);
        assert_eq!(table.len(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("Exclusive"));
        assert!(rendered.contains("5.000 ns"));
    }

    #[test]
    fn json_file_reporter_writes_report() {
        let path = std::env::temp_dir().join(format!("probekit-report-{}.json", std::process::id()));
        JsonFileReporter::new(&path).report(&sample()).unwrap();
        let written: ReportData =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.components[0].rows[0].exclusive, "4 ns");
        let _ = std::fs::remove_file(&path);
    }
}
