//! bouncer: pre-tool-use hook for AI coding agents.
//!
//! With no arguments, reads one hook payload from stdin, writes the verdict
//! to stdout and exits 0 (allow) or 2 (deny). Diagnostics go to stderr at
//! the level named by `BOUNCER_LOG` (default `warn`).
//!
//!   bouncer                          hook mode
//!   bouncer check                    print the effective configuration
//!   bouncer test [-v] <tool> <input> evaluate a synthetic call

use std::io::{Read, Write};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use bouncer::adapter::{EXIT_ALLOW, EXIT_DENY};
use bouncer::config::Config;
use bouncer::eval::{Decision, Pipeline, ToolCall, ToolInput};
use bouncer::llm::SystemCredentials;
use bouncer::rules::{self, ToolField};

const EXIT_USAGE: u8 = 1;

const USAGE: &str = "usage: bouncer [check | test [-v] <tool> <input...>]";

fn init_logging() {
    let level = std::env::var("BOUNCER_LOG")
        .ok()
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Warn);
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    // Only fails when a logger is already installed.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("-h" | "--help" | "help")) {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bouncer: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("bouncer: cannot start runtime: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    runtime.block_on(async {
        match args.first().map(String::as_str) {
            None => hook(&config).await,
            Some("check") => check(&config).await,
            Some("test") => test(&config, &args[1..]).await,
            Some(other) => {
                eprintln!("bouncer: unknown command '{other}'\n{USAGE}");
                ExitCode::from(EXIT_USAGE)
            }
        }
    })
}

async fn hook(config: &Config) -> ExitCode {
    let mut input = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut input) {
        eprintln!("bouncer: failed to read stdin: {e}");
        return ExitCode::from(EXIT_USAGE);
    }

    let pipeline = Pipeline::from_config(config, &SystemCredentials).await;
    let response = pipeline.run(&input).await;

    if let Err(e) = write_verdict(&response.body) {
        eprintln!("bouncer: failed to write verdict: {e}");
    }
    exit_code(response.exit_code)
}

fn write_verdict(body: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

async fn check(config: &Config) -> ExitCode {
    let pipeline = Pipeline::from_config(config, &SystemCredentials).await;

    println!("version:        {}", config.version);
    println!("default action: {}", config.default_action.as_str());
    println!("rule groups:");
    for name in rules::builtin_group_names() {
        let state = if config.is_group_enabled(name) { "enabled" } else { "disabled" };
        println!("  {name:<18} {state}");
    }
    println!("compiled rules: {}", pipeline.rules().len());
    for (group, count) in pipeline.rules().group_counts() {
        println!("  {group:<18} {count}");
    }
    println!("custom rules:   {}", config.custom_rules.len());

    let llm = &config.llm_fallback;
    if llm.enabled {
        println!(
            "llm fallback:   enabled (threshold {}, max_tokens {}, provider {})",
            llm.confidence_threshold,
            llm.max_tokens,
            if pipeline.has_judge() { "selected" } else { "none available" }
        );
        for provider in &llm.provider_chain {
            let model = if provider.model.is_empty() { "-" } else { provider.model.as_str() };
            println!("  {:<18} {model} ({}s)", provider.kind, provider.timeout_seconds);
        }
    } else {
        println!("llm fallback:   disabled");
    }

    if config.logging.enabled {
        println!(
            "audit log:      {} ({})",
            config.logging.path,
            config.logging.level.as_str()
        );
    } else {
        println!("audit log:      disabled");
    }
    ExitCode::SUCCESS
}

async fn test(config: &Config, args: &[String]) -> ExitCode {
    let (verbose, rest) = match args.first().map(String::as_str) {
        Some("-v" | "--verbose") => (true, &args[1..]),
        _ => (false, args),
    };
    let [tool, input @ ..] = rest else {
        eprintln!("{USAGE}");
        return ExitCode::from(EXIT_USAGE);
    };
    if input.is_empty() {
        eprintln!("{USAGE}");
        return ExitCode::from(EXIT_USAGE);
    }
    let call = synthetic_call(tool, &input.join(" "));

    let pipeline = Pipeline::from_config(config, &SystemCredentials).await;
    let started = Instant::now();
    let result = pipeline.evaluate(&call).await;
    let elapsed = started.elapsed();

    println!("{} ({})", result.decision.label(), result.tier.label());
    println!("reason: {}", result.reason);
    if verbose {
        if let Some(m) = pipeline.rules().evaluate(&call) {
            println!("rule:   {}/{}", m.group, m.rule.name);
        }
        println!("took:   {elapsed:?}");
    }
    exit_code(match result.decision {
        Decision::Allow => EXIT_ALLOW,
        Decision::Deny => EXIT_DENY,
    })
}

/// A call whose inspected field holds `value`, or whose input is `value`
/// parsed as a JSON object when the tool has no known field.
fn synthetic_call(tool: &str, value: &str) -> ToolCall {
    let input = match rules::resolve_field(tool) {
        ToolField::Command => ToolInput::for_command(value),
        ToolField::Path => ToolInput::for_path(value),
        ToolField::Pattern => ToolInput::for_pattern(value),
        ToolField::Query => ToolInput::for_query(value),
        ToolField::Url => ToolInput::for_url(value),
        ToolField::Content | ToolField::Unknown => serde_json::from_str(value)
            .unwrap_or_else(|_| ToolInput::for_command(value)),
    };
    ToolCall::new(tool, input)
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(EXIT_USAGE))
}
