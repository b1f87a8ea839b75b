use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `promptgate` - screen requests against a local policy, then generate with a compliance pass.
#[derive(Parser, Debug)]
#[command(name = "promptgate")]
#[command(version)]
#[command(about = "Policy-gated text generation.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of ~/.promptgate/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate text against the policy without generating anything
    Check {
        /// Request text to evaluate
        text: String,

        /// Rule file to evaluate against (default: config, then built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Evaluate text, then generate an answer if it is admitted
    Generate {
        /// Request text
        text: String,

        /// JSON Schema file; switches to the single-call structured path
        #[arg(long)]
        schema: Option<PathBuf>,

        /// System guidance for this request only
        #[arg(long)]
        system: Option<String>,

        /// Print the full outcome (states, verdict, usage) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a rule table and list its categories
    Rules {
        /// Rule file (default: config, then built-in rules)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print the rule table as TOML instead of a summary
        #[arg(long)]
        export: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_schema_and_global_flags() {
        let cli = Cli::try_parse_from([
            "promptgate",
            "generate",
            "Capital of France?",
            "--schema",
            "city.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate { text, schema, .. } => {
                assert_eq!(text, "Capital of France?");
                assert_eq!(schema, Some(PathBuf::from("city.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn check_requires_text() {
        assert!(Cli::try_parse_from(["promptgate", "check"]).is_err());
    }
}
