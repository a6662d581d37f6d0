//! Interactive REPL for the reasoning core.
//!
//! ## Usage
//!
//! ```bash
//! hdcore-repl                              # start REPL with default config
//! hdcore-repl --config config.toml         # start REPL with a specific config file
//! hdcore-repl --script facts.sys2          # learn a script, then exit
//! hdcore-repl --script facts.sys2 --repl   # learn a script, then open REPL
//! ```
//!
//! ## Meta commands (dot-prefix)
//! - `.learn <file>` - learn a `.sys2` file into the session
//! - `.prove <goal>` - backward-chain a goal, print the derivation
//! - `.query <pattern>` - enumerate bindings for a (possibly holey) pattern
//! - `.findall <pattern>` - literal KB scan, no rule application
//! - `.inspect <name>` - show everything known about an atom name
//! - `.stats [reset]` - show reasoner/HDC counters, optionally resetting them
//! - `.dump <file>` - write a session snapshot to disk
//! - `.load <file>` - restore a session snapshot from disk
//! - `.status` - show config/session summary
//! - `.help` - show this reference
//! - `.quit` - exit
//!
//! Anything not starting with `.` is learned directly as DSL source.

use clap::Parser;
use hdcore::config::Config;
use hdcore::session::QueryOptions;
use hdcore::Session;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hdcore-repl", about = "Deterministic neuro-symbolic reasoning core REPL")]
struct Args {
    /// Path to a `.sys2` script to learn before the REPL (or instead of it)
    script: Option<PathBuf>,

    /// Open the REPL after running `--script` (default when no script is given)
    #[arg(short, long)]
    repl: bool,

    /// Path to a config file (layered under `config.toml`/env as usual)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logging(cfg: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_new(&cfg.logging.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::load().unwrap_or_else(|_| Config::default()),
    };
    init_logging(&config);

    let mut session = Session::new(config)?;

    if let Some(script_path) = &args.script {
        println!("Learning script: {}", script_path.display());
        match fs::read_to_string(script_path) {
            Ok(source) => match session.learn(&source) {
                Ok(outcome) if outcome.success => {
                    println!(
                        "OK: {} fact(s), {} rule(s) added.",
                        outcome.facts_added, outcome.rules_added
                    );
                    for w in &outcome.warnings {
                        println!("warning: {w}");
                    }
                    if !args.repl {
                        return Ok(());
                    }
                }
                Ok(outcome) => {
                    for e in &outcome.errors {
                        println!("error: {e}");
                    }
                    if !args.repl {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    println!("fatal: {e}");
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("failed to read '{}': {e}", script_path.display());
                std::process::exit(1);
            }
        }
        println!();
    } else {
        println!("Deterministic neuro-symbolic reasoning core");
        println!("============================================");
        println!("dimensions: {}", session.config().dimensions);
        println!("strategy:   {}", session.config().resolved_strategy());
        println!();
        println!("Type .help for the command reference.");
        println!();
    }

    run_repl(&mut session)
}

fn run_repl(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    let history_path = history_path();
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        match rl.readline("hdcore> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if let Err(msg) = handle_line(session, line) {
                    println!("error: {msg}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("error: {err:?}");
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn history_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        let dir = PathBuf::from(home).join(".hdcore");
        let _ = fs::create_dir_all(&dir);
        dir.join("history")
    } else {
        PathBuf::from(".hdcore_history")
    }
}

fn handle_line(session: &mut Session, line: &str) -> Result<(), String> {
    if let Some(rest) = line.strip_prefix('.') {
        let (cmd, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let arg = arg.trim();
        match cmd {
            "learn" => cmd_learn(session, arg),
            "prove" => cmd_prove(session, arg),
            "query" => cmd_query(session, arg),
            "findall" => cmd_findall(session, arg),
            "inspect" => cmd_inspect(session, arg),
            "stats" => cmd_stats(session, arg),
            "dump" => cmd_dump(session, arg),
            "load" => cmd_load(arg).map(|restored| *session = restored),
            "status" => {
                cmd_status(session);
                Ok(())
            }
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => {
                println!("Goodbye!");
                std::process::exit(0);
            }
            other => Err(format!("unknown command '.{other}'; type .help")),
        }
    } else {
        cmd_learn_source(session, line)
    }
}

fn cmd_learn(session: &mut Session, path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("usage: .learn <file>".to_string());
    }
    let source = fs::read_to_string(path).map_err(|e| format!("reading '{path}': {e}"))?;
    cmd_learn_source(session, &source)
}

fn cmd_learn_source(session: &mut Session, source: &str) -> Result<(), String> {
    let outcome = session.learn(source).map_err(|e| e.to_string())?;
    if outcome.success {
        println!(
            "OK: {} fact(s), {} rule(s) added.",
            outcome.facts_added, outcome.rules_added
        );
        for w in &outcome.warnings {
            println!("warning: {w}");
        }
        Ok(())
    } else {
        for e in &outcome.errors {
            println!("error: {e}");
        }
        Ok(())
    }
}

fn cmd_prove(session: &mut Session, goal: &str) -> Result<(), String> {
    if goal.is_empty() {
        return Err("usage: .prove <goal>".to_string());
    }
    let derivation = session.prove(goal).map_err(|e| e.to_string())?;
    if derivation.valid {
        println!("true");
        if let Some(method) = &derivation.method {
            println!("  via: {method}");
        }
        println!("  steps: {}", derivation.steps.len());
    } else {
        println!("false");
        if let Some(reason) = &derivation.reason {
            println!("  reason: {reason}");
        }
    }
    Ok(())
}

fn cmd_query(session: &mut Session, pattern: &str) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("usage: .query <pattern>".to_string());
    }
    let result = session
        .query(pattern, QueryOptions::default())
        .map_err(|e| e.to_string())?;
    if result.bindings.is_empty() {
        println!("no results.");
    } else {
        for binding in &result.bindings {
            println!("  {binding:?}");
        }
        if result.truncated {
            println!("(truncated at max_results)");
        }
    }
    Ok(())
}

fn cmd_findall(session: &Session, pattern: &str) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("usage: .findall <pattern>".to_string());
    }
    let result = session.find_all(pattern).map_err(|e| e.to_string())?;
    if result.results.is_empty() {
        println!("no results.");
    } else {
        for fact in &result.results {
            let sign = if fact.polarity { "" } else { "not " };
            println!("  {sign}{}({})", fact.operator, fact.args.join(", "));
        }
    }
    Ok(())
}

fn cmd_inspect(session: &Session, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("usage: .inspect <name>".to_string());
    }
    let report = session.inspect(name);
    println!("known: {}", report.known);
    println!("facts mentioning '{name}': {}", report.facts.len());
    for fact in &report.facts {
        println!("  {}({})", fact.operator, fact.args.join(", "));
    }
    println!("rules mentioning '{name}': {:?}", report.rule_ids);
    Ok(())
}

fn cmd_stats(session: &mut Session, arg: &str) -> Result<(), String> {
    let reset = arg == "reset";
    let stats = session.stats(reset);
    println!("{:#?}", stats);
    Ok(())
}

fn cmd_dump(session: &Session, path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("usage: .dump <file>".to_string());
    }
    let bytes = session.dump().map_err(|e| e.to_string())?;
    fs::write(path, bytes).map_err(|e| format!("writing '{path}': {e}"))?;
    println!("wrote {path}");
    Ok(())
}

fn cmd_load(path: &str) -> Result<Session, String> {
    if path.is_empty() {
        return Err("usage: .load <file>".to_string());
    }
    let bytes = fs::read(path).map_err(|e| format!("reading '{path}': {e}"))?;
    let session = Session::from_bytes(&bytes).map_err(|e| e.to_string())?;
    println!("loaded {path}");
    Ok(session)
}

fn cmd_status(session: &Session) {
    println!("dimensions: {}", session.config().dimensions);
    println!("strategy:   {}", session.config().resolved_strategy());
    println!("cwa:        {}", session.config().closed_world_assumption);
}

fn print_help() {
    println!("Meta commands:");
    println!("  .learn <file>       Learn a .sys2 file into the session");
    println!("  .prove <goal>       Backward-chain a goal, print the derivation");
    println!("  .query <pattern>    Enumerate bindings for a (possibly holey) pattern");
    println!("  .findall <pattern>  Literal KB scan, no rule application");
    println!("  .inspect <name>     Show everything known about an atom name");
    println!("  .stats [reset]      Show reasoner/HDC counters, optionally resetting them");
    println!("  .dump <file>        Write a session snapshot to disk");
    println!("  .load <file>        Restore a session snapshot from disk");
    println!("  .status             Show config/session summary");
    println!("  .help               Show this reference");
    println!("  .quit               Exit");
    println!();
    println!("Anything else is learned directly as DSL source, e.g.:");
    println!("  isA Rex Dog");
}
