use std::path::PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Analyze memory-3 Prisoner's Dilemma strategies", long_about = None)]
pub struct Cli {
    /// Log every escalation and refinement round
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// JSON analysis config (`{"noise": 0.01, "payoffs": {...}}`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

/// Strategy arguments accept a 64 or 512 character encoding or one of the
/// reference names `allc`, `alld`, `tft`, `wsls`, `grim`.
#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Classify a strategy, or every line of a file, as JSON lines",
        alias = "cls"
    )]
    Classify {
        #[arg(required = true)]
        input: String,
    },
    #[command(about = "Check whether a partial strategy (c, d, _, *) is defensible")]
    Defensible {
        #[arg(required = true)]
        partial: String,
    },
    #[command(about = "Minimize the strategy's automaton", alias = "min")]
    Minimize {
        #[arg(required = true)]
        strategy: String,
    },
    #[command(about = "Long-run outcome frequencies and payoffs under noise")]
    Stationary {
        #[arg(required = true)]
        focal: String,
        /// Opponent strategy; self-play when omitted
        #[arg(long)]
        opponent: Option<String>,
        /// Overrides the configured noise
        #[arg(long)]
        noise: Option<f64>,
    },
    #[command(about = "Perturbation rounds between terminal components of self-play")]
    Depths {
        #[arg(required = true)]
        strategy: String,
    },
    #[command(about = "Follow self-play from a state until it repeats")]
    Trace {
        #[arg(required = true)]
        strategy: String,
        /// State id or text such as `cccccd`
        #[arg(required = true)]
        state: String,
    },
    #[command(about = "Print the transition graph as DOT")]
    Dot {
        #[arg(required = true)]
        strategy: String,
        /// Graph against this opponent instead of self-play
        #[arg(long = "with")]
        with: Option<String>,
        #[arg(long)]
        remove_isolated: bool,
    },
    #[command(about = "List completions of a partial strategy")]
    Expand {
        #[arg(required = true)]
        partial: String,
        /// Stop after this many completions
        #[arg(long)]
        limit: Option<usize>,
        /// Only print defensible completions
        #[arg(long)]
        defensible: bool,
    },
}
