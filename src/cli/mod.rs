//! autods CLI Module
//!
//! Command-line interface for running the pipeline, cleaning data and
//! inspecting datasets.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cleaning::Cleaner;
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::pipeline::{AutoPipeline, PipelineRun};
use crate::training::{TaskType, REGISTRY};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 90) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "autods")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated cleaning, feature synthesis and model search for tabular data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean the data, synthesize features and pick the best model
    Run {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (detected when omitted)
        #[arg(short, long)]
        target: Option<String>,

        /// Task type (classification, regression); detected when omitted
        #[arg(long)]
        task: Option<String>,

        /// JSON file with pipeline settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the run summary as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the selected features and the target as CSV
        #[arg(long)]
        features_out: Option<PathBuf>,
    },

    /// Clean a dataset and write the result
    Clean {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with pipeline settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show a profile of a dataset
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// List the candidate models
    Models,
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<Dataset> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "csv" | "txt" => Ok(Dataset::read_csv(path)?),
        _ => anyhow::bail!("Unsupported file format: {}", ext),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => Ok(PipelineConfig::from_json_file(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    data_path: &Path,
    target: Option<&str>,
    task: Option<&str>,
    config_path: Option<&Path>,
    report: Option<&Path>,
    features_out: Option<&Path>,
) -> anyhow::Result<()> {
    section("Run");

    let config = load_config(config_path)?;
    let task_hint = task.map(str::parse::<TaskType>).transpose()?;

    step_run("Loading data");
    let start = Instant::now();
    let dataset = load_data(data_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        dataset.n_rows(),
        dataset.n_cols(),
        start.elapsed()
    ));

    let mut pipeline = AutoPipeline::new(config).with_task_hint(task_hint);
    if let Some(target) = target {
        pipeline = pipeline.with_target(target);
    }

    step_run("Running pipeline");
    let run = pipeline.run(&dataset)?;
    step_done(&format!("{:.2}s", run.elapsed_secs));

    print_run(&run);

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&run.summary())?;
        std::fs::write(path, json)?;
        step_ok(&format!("Report → {}", path.display()));
    }

    if let Some(path) = features_out {
        let mut table = run.features.features.clone();
        table.push_column(run.features.target.clone())?;
        table.write_csv(path)?;
        step_ok(&format!(
            "Features → {} ({} cols)",
            path.display(),
            table.n_cols()
        ));
    }

    println!();
    Ok(())
}

fn print_run(run: &PipelineRun) {
    let outcome = &run.outcome;

    println!();
    line_box_top();
    line_box(&kv("Target  ", &format!("{} ({})", run.target, outcome.task)));
    line_box(&kv("Rows    ", &format!(
        "{} raw, {} cleaned",
        run.cleaning_report.rows_before(),
        run.cleaning_report.rows_after()
    )));
    line_box(&kv("Features", &format!(
        "{} generated, {} selected",
        run.features.catalog.len(),
        run.features.n_features()
    )));
    line_box(&kv("Best    ", &format!(
        "{} {} {:.4}",
        outcome.best_model_name,
        outcome.primary_metric_name(),
        outcome.best_score()
    )));
    line_box_bottom();

    section("Cleaning");
    for line in run.cleaning_report.summary_lines() {
        println!("  {}", line);
    }

    section("Models");
    println!(
        "  {:<24} {:>10} {:>10}",
        muted("Model"),
        muted(outcome.primary_metric_name()),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(46)));
    for candidate in &outcome.candidates {
        match &candidate.metrics {
            Some(metrics) => {
                let name = if candidate.name == outcome.best_model_name {
                    format!("{}", candidate.name.white().bold())
                } else {
                    candidate.name.clone()
                };
                let pad = 24usize.saturating_sub(candidate.name.chars().count());
                println!(
                    "  {}{} {:>10.4} {:>9.2}s",
                    name,
                    " ".repeat(pad),
                    metrics.primary(),
                    candidate.training_time_secs
                );
            }
            None => {
                let reason = candidate.failure.as_deref().unwrap_or("unknown error");
                println!("  {:<24} {}", candidate.name, format!("err: {}", reason).red());
            }
        }
    }
    println!("  {}", dim(&"─".repeat(46)));

    section(&format!("Best model: {}", outcome.best_model_name));
    for (name, value) in outcome.best_metrics.entries() {
        println!("  {:<12} {}", muted(name), format!("{:.4}", value).white());
    }
    if let Some(m) = outcome.best_metrics.as_classification() {
        println!();
        println!("  {}", muted("Confusion matrix (rows = truth)"));
        for (label, row) in outcome.class_labels.iter().zip(&m.confusion_matrix) {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>6}", c)).collect();
            println!("  {:<14}{}", label, cells.join(""));
        }
    }
    if !outcome.feature_importances.is_empty() {
        println!();
        println!("  {}", muted("Top features"));
        for fi in outcome.feature_importances.iter().take(10) {
            println!("  {:<28} {:.4}", fi.feature, fi.importance);
        }
    }

    let warnings: Vec<String> = run
        .cleaning_report
        .warnings()
        .iter()
        .map(ToString::to_string)
        .chain(outcome.warnings.iter().map(ToString::to_string))
        .collect();
    if !warnings.is_empty() {
        section("Warnings");
        for w in warnings {
            println!("  {} {}", warn("!"), w);
        }
    }
}

pub fn cmd_clean(data_path: &Path, output_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Clean");

    let config = load_config(config_path)?;

    step_run("Loading data");
    let dataset = load_data(data_path)?;
    step_done(&format!("{} rows × {} cols", dataset.n_rows(), dataset.n_cols()));

    step_run("Cleaning");
    let start = Instant::now();
    let (cleaned, report) = Cleaner::new(config).clean(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output_path.display()));
    cleaned.write_csv(output_path)?;
    step_done(&format!("{} rows × {} cols", cleaned.n_rows(), cleaned.n_cols()));

    println!();
    for line in report.summary_lines() {
        println!("  {}", line);
    }
    for w in report.warnings() {
        println!("  {} {}", warn("!"), w);
    }
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let dataset = load_data(data_path)?;
    let profile = dataset.profile();

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), profile.n_rows);
    println!("  {:<12} {}", muted("Columns"), profile.n_cols);
    println!("  {:<12} {}", muted("Duplicates"), profile.duplicate_rows);
    println!("  {:<12} {}", muted("Missing"), profile.total_missing);
    println!();

    println!(
        "  {:<20} {:<16} {:>8} {:>8}",
        muted("Column"),
        muted("Kind"),
        muted("Missing"),
        muted("Unique")
    );
    println!("  {}", dim(&"─".repeat(56)));

    for col in &profile.columns {
        println!(
            "  {:<20} {:<16} {:>7.1}% {:>8}",
            col.name,
            col.kind.to_string().truecolor(140, 140, 140),
            col.missing_fraction * 100.0,
            col.distinct_count
        );
    }

    println!();
    Ok(())
}

pub fn cmd_models() -> anyhow::Result<()> {
    section("Models");

    println!("  {:<24} {}", muted("Model"), muted("Tasks"));
    println!("  {}", dim(&"─".repeat(46)));
    for descriptor in REGISTRY {
        println!("  {:<24} {}", descriptor.name, descriptor.applicability);
    }

    println!();
    Ok(())
}
