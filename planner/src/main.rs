//! Blocks-world planner CLI.
//!
//! Reads a JSON plan request (stacks, goal towers, options, optional world
//! edits), prints the resulting schedule as JSON on stdout, and maps the
//! outcome to a stable exit code.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use planner::core::types::Block;
use planner::cycle::{CycleRunner, StopReason};
use planner::exit_codes;
use planner::io::config::load_config;
use planner::io::intention_log::write_run;
use planner::io::request::load_request;
use planner::logging;
use planner::plan::{PlanReport, PlannerOptions, start_with};
use planner::replan::{ReplanRequest, current_world};

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Blocks-world planning and multi-agent scheduling engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan from the given stacks to the goal and print the report.
    Plan(RunArgs),
    /// Apply world edits to the given stacks, then plan from the result.
    Replan(RunArgs),
    /// Print one intention-log entry per line as cycles run, then the report.
    Cycles {
        #[command(flatten)]
        run: RunArgs,
        /// Stop after this many cycles (reported as cancelled).
        #[arg(long)]
        max_cycles: Option<u32>,
    },
    /// Check the request against the schema, the world and the goal.
    Validate {
        #[arg(short, long)]
        request: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Plan request (JSON).
    #[arg(short, long)]
    request: PathBuf,
    /// Planner config (TOML). Missing file means defaults.
    #[arg(short, long, default_value = "planner.toml")]
    config: PathBuf,
    /// Write the intention log and report under this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => cmd_plan(&args, Mode::Plan),
        Command::Replan(args) => cmd_plan(&args, Mode::Replan),
        Command::Cycles {
            run: args,
            max_cycles,
        } => cmd_plan(&args, Mode::Stream { max_cycles }),
        Command::Validate { request } => cmd_validate(&request),
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Plain planning; world edits are rejected.
    Plan,
    Replan,
    /// Print every cycle as a JSON line before the report.
    Stream { max_cycles: Option<u32> },
}

fn cmd_plan(args: &RunArgs, mode: Mode) -> Result<i32> {
    let config = load_config(&args.config)?;
    let request = load_request(&args.request)?;
    if matches!(mode, Mode::Plan) && !request.edits.is_empty() {
        bail!("request contains world edits; use `planner replan`");
    }

    let (initial, mut runner) = prepare(&request, &config.planner_options())?;
    let mut out = io::stdout().lock();
    let report = match mode {
        Mode::Plan | Mode::Replan => runner.run_to_end(),
        Mode::Stream { max_cycles } => {
            let limit = max_cycles.map_or(usize::MAX, |n| n as usize);
            for entry in runner.by_ref().take(limit) {
                serde_json::to_writer(&mut out, &entry).context("serialize cycle")?;
                writeln!(out).context("write stdout")?;
            }
            runner.finish()
        }
    };

    if let Some(dir) = &args.log_dir {
        write_run(dir, &initial, &report)?;
    }
    if matches!(mode, Mode::Stream { .. }) {
        serde_json::to_writer(&mut out, &report).context("serialize report")?;
        writeln!(out).context("write stdout")?;
    } else {
        write_pretty(&mut out, &report)?;
    }
    info!(
        iterations = report.iterations,
        moves = report.move_count(),
        achieved = report.goal_achieved,
        "plan command finished"
    );
    Ok(exit_code(&report))
}

fn cmd_validate(path: &Path) -> Result<i32> {
    let request = load_request(path)?;
    prepare(&request, &PlannerOptions::default())?;
    Ok(exit_codes::OK)
}

/// Build the runner for `request`, returning the stacks it starts from.
fn prepare(
    request: &ReplanRequest,
    defaults: &PlannerOptions,
) -> Result<(Vec<Vec<Block>>, CycleRunner)> {
    let beliefs = current_world(request).context("invalid world")?;
    let initial = beliefs.stacks();
    let goal = request.plan.resolve_goal().context("invalid goal")?;
    let options = request.plan.options.apply_to(defaults);
    let runner = start_with(beliefs, goal, options).context("invalid goal")?;
    Ok((initial, runner))
}

fn exit_code(report: &PlanReport) -> i32 {
    match report.stop {
        StopReason::Achieved => exit_codes::OK,
        StopReason::BudgetExhausted { .. } | StopReason::Cancelled { .. } => {
            exit_codes::BUDGET_EXHAUSTED
        }
        StopReason::TimedOut { .. } => exit_codes::TIMED_OUT,
    }
}

/// Serialize `value` to pretty-printed JSON with trailing newline.
fn write_pretty<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("serialize json")?;
    writeln!(out).context("write stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_defaults_config_path() {
        let cli = Cli::parse_from(["planner", "plan", "--request", "req.json"]);
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.request, PathBuf::from("req.json"));
        assert_eq!(args.config, PathBuf::from("planner.toml"));
        assert!(args.log_dir.is_none());
    }

    #[test]
    fn parse_cycles_with_cap() {
        let cli = Cli::parse_from([
            "planner",
            "cycles",
            "-r",
            "req.json",
            "--max-cycles",
            "3",
            "--log-dir",
            "out",
        ]);
        let Command::Cycles { run, max_cycles } = cli.command else {
            panic!("expected cycles");
        };
        assert_eq!(max_cycles, Some(3));
        assert_eq!(run.log_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn parse_validate() {
        let cli = Cli::parse_from(["planner", "validate", "-r", "req.json"]);
        assert!(matches!(cli.command, Command::Validate { .. }));
    }
}
