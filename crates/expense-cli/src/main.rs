//! Expense blob CLI
//!
//! Command line access to the receipt store: upload a file, download it
//! again, or inspect its stored record.

mod commands;

use clap::{Parser, Subcommand};
use commands::{GetCommand, PutCommand, StatCommand, StoreArgs};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "EXPENSE_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "EXPENSE_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file into a bucket
    Put(PutCommand),
    /// Download a stored blob
    Get(GetCommand),
    /// Print the stored record of a blob
    Stat(StatCommand),
}

fn init_tracing(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    // If RUST_LOG is set, use it as-is; otherwise scope the level to our crates
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "expense_cli={level},expense_blob={level},mongodb=warn",
            level = log_level
        ))
    };

    let fmt_layer = match log_format {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Put(cmd) => cmd.execute(&cli.store),
        Commands::Get(cmd) => cmd.execute(&cli.store),
        Commands::Stat(cmd) => cmd.execute(&cli.store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from([
            "expense-blob",
            "--log-level",
            "debug",
            "put",
            "receipts",
            "./r123.png",
            "--metadata",
            r#"{"userId":"42"}"#,
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Put(cmd) => {
                assert_eq!(cmd.bucket, "receipts");
                assert_eq!(cmd.metadata.as_deref(), Some(r#"{"userId":"42"}"#));
                assert!(cmd.name.is_none());
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn test_parse_get_with_output() {
        let cli =
            Cli::try_parse_from(["expense-blob", "get", "receipts", "r123.png", "-o", "out.png"])
                .unwrap();

        match cli.command {
            Commands::Get(cmd) => {
                assert_eq!(cmd.name, "r123.png");
                assert_eq!(cmd.output.unwrap().to_str(), Some("out.png"));
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_store_flags_before_subcommand() {
        let cli = Cli::try_parse_from([
            "expense-blob",
            "--database",
            "staging",
            "--chunk-size",
            "1024",
            "stat",
            "receipts",
            "r1.png",
        ])
        .unwrap();

        assert_eq!(cli.store.database.as_deref(), Some("staging"));
        assert_eq!(cli.store.chunk_size, Some(1024));
        match cli.command {
            Commands::Stat(cmd) => assert_eq!(cmd.name, "r1.png"),
            _ => panic!("expected stat"),
        }
    }

    #[test]
    fn test_store_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "expense-blob",
            "get",
            "receipts",
            "r1.png",
            "--mongodb-url",
            "mongodb://db:27017",
        ])
        .unwrap();

        assert_eq!(cli.store.mongodb_url.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(cli.store.config().url, "mongodb://db:27017");
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["expense-blob"]).is_err());
    }
}
