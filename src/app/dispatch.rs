use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use promptgate::config::Config;
use promptgate::gate::Gate;
use promptgate::pipeline::{CliProgressSink, GenerationRequest, OutputSchema};
use promptgate::security::{PolicyEngine, PolicyRules};

use crate::app::render::{render_decision, render_rules};
use crate::cli::commands::{Cli, Commands};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Check { text, rules } => run_check(&config, rules.as_deref(), &text),
        Commands::Generate {
            text,
            schema,
            system,
            json,
        } => run_generate(&config, text, schema.as_deref(), system, json).await,
        Commands::Rules { file, export } => run_rules(&config, file.as_deref(), export),
    }
}

/// Explicit file, then the configured rule file, then the built-in table.
fn resolve_rules(config: &Config, explicit: Option<&Path>) -> Result<(PolicyRules, String)> {
    let path: Option<PathBuf> = explicit
        .map(Path::to_path_buf)
        .or_else(|| config.policy.resolved_rules_path());
    match path {
        Some(p) => {
            let rules = PolicyRules::load(&p)?;
            Ok((rules, p.display().to_string()))
        }
        None => Ok((PolicyRules::default(), "built-in".to_string())),
    }
}

fn run_check(config: &Config, rules_path: Option<&Path>, text: &str) -> Result<()> {
    let (rules, source) = resolve_rules(config, rules_path)?;
    let engine = PolicyEngine::with_numeric_cap(rules, config.policy.max_numeric_tokens);
    let decision = engine.evaluate(text);
    info!(rules = %source, admitted = decision.admitted, "policy check");

    println!("{}", serde_json::to_string_pretty(&decision)?);
    eprintln!("{}", render_decision(&decision));
    decision.into_result()?;
    Ok(())
}

async fn run_generate(
    config: &Config,
    text: String,
    schema_path: Option<&Path>,
    system: Option<String>,
    json: bool,
) -> Result<()> {
    let gate = Gate::from_config(config)?;

    let mut request = GenerationRequest::new(text);
    if let Some(path) = schema_path {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read schema {}", path.display()))?;
        request = request.with_output_schema(OutputSchema::from_json_str(&raw)?);
    }
    if let Some(guidance) = system {
        request = request.with_system_guidance(guidance);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let submission = match gate
        .submit(request, Some(&CliProgressSink), Some(&cancel))
        .await
    {
        Ok(submission) => submission,
        Err(err) if err.is_policy_denied() => {
            eprintln!("⛔ {err}. Rephrase the request and try again.");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&submission)?);
    } else if let Some(structured) = &submission.output.structured {
        println!("{}", serde_json::to_string_pretty(structured)?);
    } else {
        println!("{}", submission.output.text);
    }
    Ok(())
}

fn run_rules(config: &Config, file: Option<&Path>, export: bool) -> Result<()> {
    let (rules, source) = resolve_rules(config, file)?;
    rules.validate()?;
    if export {
        print!("{}", rules.to_toml_string()?);
    } else {
        println!("{}", render_rules(&rules, &source));
    }
    Ok(())
}
