//! Handoff CLI
//!
//! Usage:
//!   handoff --text "your message"                 # Single evaluation
//!   handoff --interactive                         # Running conversation (U: / A:)
//!   handoff --text "msg" --rules rules.json       # With custom rules
//!   handoff --text "msg" --context tier=gold      # With caller attributes
//!   handoff --text "msg" --json                   # JSON output

use std::io::{self, BufRead, Write};
use std::path::Path;
use clap::Parser;
use colored::Colorize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use handoff::core::{DecisionAggregator, DegradationTracker};
use handoff::types::{Context, HandoffDecision, Rule, Speaker, Turn};
use handoff::{EngineConfig, HandoffError, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "handoff",
    version = VERSION,
    about = "Decide whether a conversation should be handed to a human",
    long_about = "Runs the handoff decision engine over one message or a running conversation.\n\n\
                  Signals:\n  \
                  EXPLICIT_REQUEST  - user asked for a human\n  \
                  FAILURE_PATTERN   - agent keeps failing\n  \
                  KEYWORD           - critical phrase (fraud, safety, legal, ...)\n  \
                  RULE_BASED        - a rule from --rules matched\n  \
                  SENTIMENT         - resolved sentiment below threshold\n\n\
                  Interactive mode reads lines prefixed with U: (user) or A: (agent).\n\
                  Unprefixed lines are treated as user turns."
)]
struct Args {
    /// Message to evaluate (single mode)
    #[arg(short, long)]
    text: Option<String>,

    /// Interactive mode - read a conversation from stdin
    #[arg(short, long)]
    interactive: bool,

    /// JSON file with a list of rules
    #[arg(long)]
    rules: Option<String>,

    /// JSON file with engine configuration
    #[arg(long)]
    config: Option<String>,

    /// Caller attribute as key=value (repeatable; JSON values are parsed)
    #[arg(long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show every signal and the sentiment breakdown
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let aggregator = match build_aggregator(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    let context = match parse_context(&args.context) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid --context: {}", e);
            std::process::exit(2);
        }
    };

    if args.interactive {
        run_interactive(&aggregator, &context, &args).await;
    } else if let Some(ref text) = args.text {
        run_single(&aggregator, &context, text, &args).await;
    } else {
        // Default to interactive if no mode specified
        run_interactive(&aggregator, &context, &args).await;
    }
}

/// Config and rules from disk, validated up front
fn build_aggregator(args: &Args) -> Result<DecisionAggregator, HandoffError> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_str(&read_file(path)?)?,
        None => EngineConfig::default(),
    };
    let aggregator = DecisionAggregator::with_config(config)?;

    if let Some(path) = &args.rules {
        let rules: Vec<Rule> = serde_json::from_str(&read_file(path)?)?;
        for rule in rules {
            aggregator.add_rule(rule)?;
        }
    }
    Ok(aggregator)
}

fn read_file(path: &str) -> Result<String, HandoffError> {
    std::fs::read_to_string(Path::new(path))
        .map_err(|e| HandoffError::InvalidConfig(format!("cannot read {}: {}", path, e)))
}

/// `key=value` pairs; values that parse as JSON keep their type
fn parse_context(pairs: &[String]) -> Result<Context, String> {
    let mut context = Context::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty key in {:?}", pair));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        context.insert(key.to_string(), value);
    }
    Ok(context)
}

/// Run single message evaluation
async fn run_single(aggregator: &DecisionAggregator, context: &Context, text: &str, args: &Args) {
    let turn = Turn::user(text);
    let decision = aggregator.decide(&[], &turn, context).await;
    print_decision(&decision, args);
}

/// Run interactive conversation mode
async fn run_interactive(aggregator: &DecisionAggregator, context: &Context, args: &Args) {
    let mut history: Vec<Turn> = Vec::new();
    let mut tracker: DegradationTracker = aggregator.new_tracker();

    print_header(args.no_color);
    println!("Prefix each line with U: (user) or A: (agent).");
    println!("Example: U: my card was charged twice");
    println!("         A: I'm not sure what you mean.");
    println!("Type 'reset' to start a new conversation, 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{} turns] > ", history.len());
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nSession ended. Turns: {}", history.len());
            break;
        }
        if line.eq_ignore_ascii_case("reset") {
            history.clear();
            tracker.clear();
            println!("Conversation reset.");
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let (speaker, text) = parse_speaker_prefix(line);
        let turn = Turn::new(speaker, text);
        let decision = aggregator
            .decide_tracked(&history, &turn, context, &mut tracker)
            .await;

        print_decision(&decision, args);
        history.push(turn);
    }
}

/// Parse speaker prefix (U: or A:); anything else is a user turn
fn parse_speaker_prefix(line: &str) -> (Speaker, &str) {
    let line = line.trim();

    if let Some((prefix, rest)) = line.split_once(':') {
        match prefix.trim().to_ascii_uppercase().as_str() {
            "U" | "USER" => return (Speaker::User, rest.trim()),
            "A" | "AGENT" => return (Speaker::Agent, rest.trim()),
            "S" | "SYSTEM" => return (Speaker::System, rest.trim()),
            _ => {}
        }
    }

    (Speaker::User, line)
}

/// Print header
fn print_header(no_color: bool) {
    let title = format!("Handoff Engine v{} - Interactive", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "========================================".bold());
        println!("  {}", title.bold());
        println!("{}", "========================================".bold());
    }
    println!();
}

fn print_decision(decision: &HandoffDecision, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(decision) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize decision: {}", e),
        }
    } else if args.verbose {
        print_verbose(decision, args.no_color);
    } else if args.no_color {
        println!("{}", decision.to_parseable_string());
    } else {
        println!("{}", decision.to_terminal_string());
    }
}

/// Print every signal and the sentiment breakdown
fn print_verbose(decision: &HandoffDecision, no_color: bool) {
    let headline = if no_color {
        decision.to_parseable_string()
    } else {
        decision.to_terminal_string()
    };
    println!("{}", headline);

    println!("  Signals:");
    for signal in &decision.signals {
        let mark = if signal.triggered { "x" } else { " " };
        let line = format!(
            "    [{}] {:<22} conf={:.2} prio={:<9} {}",
            mark,
            signal.kind.as_str(),
            signal.confidence,
            signal.priority.to_string(),
            signal.reason
        );
        if signal.triggered && !no_color {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }

    let s = &decision.sentiment;
    let b = &s.breakdown;
    println!("  Sentiment:");
    println!(
        "    score={:.3} frustration={:.3} confidence={:.2} tier={} escalated={} degrading={}",
        s.score, s.frustration, s.confidence, s.tier_used, s.escalated, s.degradation_detected
    );
    println!(
        "    keywords={:+.2} caps={:+.2} ({} words) punctuation={:+.2} ({} runs)",
        b.keyword_adjustment(),
        b.caps_penalty,
        b.caps_words,
        b.punctuation_penalty,
        b.punctuation_runs
    );
    for attempt in &s.attempts {
        println!("    {} -> {:?}", attempt.tier, attempt.outcome);
    }
    println!("    elapsed={}us", s.elapsed.as_micros());
}
