//! ipd-analyze
//!
//! Command-line front end for the strategy analysis crate. Verdicts are
//! written to stdout as JSON, diagnostics go to the terminal logger.

mod cli;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use serde_json::json;
use strategy_analysis::batch::classify_all;
use strategy_analysis::stationary::long_run;
use strategy_analysis::{
    classify, component_escalation_depths, AnalysisConfig, Automaton, PartialStrategy, State, StateSpace, Strategy,
};
use cli::{Cli, Command};

fn log(verbose: bool) -> Result<()> {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .context("initialize logger")
}

/// A reference name or a full encoding
fn strategy(text: &str) -> Result<Strategy> {
    if let Some(s) = Strategy::reference(text, StateSpace::M3) {
        return Ok(s);
    }
    text.parse()
        .with_context(|| format!("'{}' is not a strategy encoding or reference name", text))
}

fn partial(text: &str) -> Result<PartialStrategy> {
    text.parse()
        .with_context(|| format!("'{}' is not a partial strategy encoding", text))
}

fn analysis_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            AnalysisConfig::from_json(&text).with_context(|| format!("parse config {}", path.display()))
        }
        None => Ok(AnalysisConfig::standard()),
    }
}

fn state_of(strategy: &Strategy, text: &str) -> Result<State> {
    let state = match text.parse::<usize>() {
        Ok(id) => strategy.space().state(id)?,
        Err(_) => text.parse::<State>()?,
    };
    if state.space() != strategy.space() {
        bail!("state '{}' does not belong to a {}-state strategy", text, strategy.len());
    }
    Ok(state)
}

fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Classify { input } => {
            let path = Path::new(&input);
            if !path.is_file() {
                let c = classify(&strategy(&input)?);
                writeln!(out, "{}", serde_json::to_string(&c)?)?;
                out.flush()?;
                return Ok(());
            }
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut write_error = None;
            let summary = classify_all(BufReader::new(file), |result| match result {
                Ok(c) => {
                    let line = serde_json::to_string(&c).map_err(anyhow::Error::from).and_then(|json| {
                        writeln!(out, "{}", json).map_err(anyhow::Error::from)
                    });
                    if let Err(e) = line {
                        write_error.get_or_insert(e);
                    }
                }
                // rejected lines are logged by the batch reader
                Err(_) => {}
            })?;
            if let Some(e) = write_error {
                return Err(e);
            }
            info!("{} classified, {} rejected", summary.classified, summary.rejected);
            if summary.rejected > 0 {
                bail!("{} malformed line(s) in {}", summary.rejected, path.display());
            }
        }
        Command::Defensible { partial: text } => {
            let p = partial(&text)?;
            writeln!(out, "{}", json!({ "strategy": p.to_string(), "defensible": p.is_defensible() }))?;
        }
        Command::Minimize { strategy: text } => {
            let minimized = Automaton::from_strategy(&strategy(&text)?).minimize();
            let report = json!({
                "states": minimized.automaton.len(),
                "classes": minimized.classes(),
                "minimized": minimized,
            });
            writeln!(out, "{}", report)?;
        }
        Command::Stationary { focal, opponent, noise } => {
            let mut config = analysis_config(cli.config.as_deref())?;
            if let Some(noise) = noise {
                config.noise = noise;
            }
            let focal = strategy(&focal)?;
            let opponent = match opponent {
                Some(text) => strategy(&text)?,
                None => focal.clone(),
            };
            let frequencies = long_run(&focal, &opponent, &config)?;
            let (focal_payoff, opponent_payoff) = frequencies.expected_payoffs(&config.payoffs);
            let report = json!({
                "focal": focal,
                "opponent": opponent,
                "noise": config.noise,
                "frequencies": frequencies,
                "payoffs": [focal_payoff, opponent_payoff],
            });
            writeln!(out, "{}", report)?;
        }
        Command::Depths { strategy: text } => {
            let depths: Vec<_> = component_escalation_depths(&strategy(&text)?)
                .into_iter()
                .map(|((from, to), rounds)| json!({ "from": from, "to": to, "rounds": rounds }))
                .collect();
            writeln!(out, "{}", serde_json::Value::Array(depths))?;
        }
        Command::Trace { strategy: text, state } => {
            let s = strategy(&text)?;
            let start = state_of(&s, &state)?;
            for step in s.trace_with_self(start)? {
                writeln!(out, "{}\t{}", step.id(), step)?;
            }
        }
        Command::Dot { strategy: text, with, remove_isolated } => {
            let s = strategy(&text)?;
            let other = with.as_deref().map(strategy).transpose()?;
            write!(out, "{}", s.to_dot(other.as_ref(), remove_isolated)?)?;
        }
        Command::Expand { partial: text, limit, defensible } => {
            let p = partial(&text)?;
            let completions = p.completions();
            info!("{} free slots", completions.free_slots());
            let kept = completions
                .filter(|s| !defensible || PartialStrategy::from(s).is_defensible())
                .take(limit.unwrap_or(usize::MAX));
            for s in kept {
                writeln!(out, "{}", s)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    log(cli.verbose)?;
    run(cli)
}
