//! LogTail Binary
//!
//! Live tail of the hosted log service, and a round-trip delivery probe.

use clap::{Args, Parser, Subcommand};
use logtail::client::{RemoteClient, ViewStore};
use logtail::config::CliConfig;
use logtail::tail::{FilterBuilder, LineRenderer, ProbeOutcome, RoundTripProbe, TailSession};
use logtail::types::{ScrollDirection, Source, View};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "logtail")]
#[command(about = "Live tail and delivery probe for the hosted log service")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Socket path of the log service
    #[arg(short, long, global = true)]
    socket: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream new records as they arrive
    Tail(TailArgs),
    /// Write a tagged record and wait for it to come back
    Probe(ProbeArgs),
}

#[derive(Args)]
struct TailArgs {
    /// Source to tail (can be repeated)
    #[arg(long = "source", value_name = "NAME[=ID]", required_unless_present = "view_file")]
    sources: Vec<Source>,

    /// Team owning the sources
    #[arg(long)]
    team: Option<String>,

    /// Start of the time window (now, now-<N><s|m|h|d>)
    #[arg(long, value_name = "SHORTHAND")]
    from: Option<String>,

    /// End of the time window, only used together with --from
    #[arg(long, value_name = "SHORTHAND")]
    to: Option<String>,

    /// Free-text query, OR-ed with the others (can be repeated)
    #[arg(short = 'q', long = "query", value_name = "TEXT")]
    queries: Vec<String>,

    /// Field to filter on
    #[arg(long)]
    field: Option<String>,

    /// Value to compare the field against
    #[arg(long)]
    value: Option<String>,

    /// Field comparison: contains, not_contains, equals, not_equals, gt, gte, lt, lte
    #[arg(long)]
    operator: Option<String>,

    /// Maximum records per poll
    #[arg(long)]
    batch_size: Option<u32>,

    /// Walk each source from newest to oldest
    #[arg(long)]
    backward: bool,

    /// Output format: text, json
    #[arg(short = 'o', long)]
    format: Option<String>,

    /// Delay between polls in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Save the filter as a named view before tailing
    #[arg(long, value_name = "NAME")]
    save_view: Option<String>,

    /// Tail a view exported as JSON instead of building a filter from flags
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = ["sources", "team", "from", "to", "queries", "field", "value", "operator"]
    )]
    view_file: Option<PathBuf>,
}

#[derive(Args)]
struct ProbeArgs {
    /// Source to write to and read back from
    #[arg(long, value_name = "NAME[=ID]")]
    source: Source,

    /// Ingestion key of the source
    #[arg(long)]
    source_token: String,

    /// Team owning the source
    #[arg(long)]
    team: Option<String>,

    /// Seconds to wait for the record
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries the record stream
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "logtail=debug,info"
        } else {
            "logtail=info,warn,error"
        })
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(socket) = cli.socket {
        config.client.socket_path = socket;
    }

    match cli.command {
        Command::Tail(args) => tail(config, args).await,
        Command::Probe(args) => probe(config, args).await,
    }
}

async fn tail(mut config: CliConfig, args: TailArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = match &args.view_file {
        Some(path) => FilterBuilder::from_view(&View::from_json(&std::fs::read_to_string(path)?)?),
        None => {
            let team = args.team.clone().unwrap_or_default();
            let sources = args
                .sources
                .iter()
                .map(|s| s.clone().with_team(team.clone()))
                .collect();

            FilterBuilder::new(sources)
                .with_start(args.from.as_deref().unwrap_or(""))
                .with_end(args.to.as_deref().unwrap_or(""))
                .with_queries(args.queries.iter().cloned())
                .with_field_filter(
                    args.field.as_deref().unwrap_or(""),
                    args.value.as_deref().unwrap_or(""),
                    args.operator.as_deref().unwrap_or(""),
                )
        }
    };

    // Override config with CLI arguments
    if let Some(batch_size) = args.batch_size {
        config.tail.batch_size = batch_size;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.tail.poll_interval_ms = interval_ms;
        config.tail.max_backoff_ms = config.tail.max_backoff_ms.max(interval_ms);
    }
    if let Some(format) = args.format {
        config.tail.format = format;
    }
    config.validate()?;

    builder = builder.with_batch_size(config.tail.batch_size);
    if args.backward {
        builder = builder.with_scroll_direction(ScrollDirection::Backward);
    }
    let spec = builder.build()?;

    let client = RemoteClient::with_config(config.client.clone()).await?;

    if let Some(name) = &args.save_view {
        let id = client.save_view(&View::from_spec(name, &spec)).await?;
        info!(view = %name, id = %id, "Saved view");
    }

    let session = TailSession::new(spec, &config.tail);
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping tail");
            cancel.cancel();
        }
    });

    let mut renderer = LineRenderer::stdout(&config.tail.format);
    let stats = session.run(&client, &mut renderer).await?;
    info!(records = stats.records, failures = stats.failures, "Tail finished");

    client.close().await?;
    Ok(())
}

async fn probe(mut config: CliConfig, args: ProbeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(secs) = args.timeout_secs {
        config.probe.timeout_seconds = secs;
    }
    config.validate()?;

    let source = args.source.with_team(args.team.unwrap_or_default());
    let client = Arc::new(RemoteClient::with_config(config.client.clone()).await?);

    let probe = RoundTripProbe::new(
        client.clone(),
        client.clone(),
        source,
        args.source_token,
        &config.probe,
    );
    let report = probe.run().await;
    let seconds = report.elapsed.as_secs_f64();

    match &report.outcome {
        ProbeOutcome::Found => println!("Record {} delivered in {:.3}s", report.token, seconds),
        ProbeOutcome::Timeout => {
            eprintln!("Timed out after {:.3}s waiting for record {}", seconds, report.token)
        }
        ProbeOutcome::Error(e) => eprintln!("Probe failed after {:.3}s: {}", seconds, e),
    }

    let _ = client.close().await;
    if !report.outcome.is_success() {
        std::process::exit(report.outcome.exit_code());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_file_rejects_filter_flags() {
        for flag in [
            ["--team", "ops"],
            ["--value", "500"],
            ["--operator", "gte"],
            ["--field", "status"],
            ["--query", "timeout"],
        ] {
            let result = Cli::try_parse_from(
                ["logtail", "tail", "--view-file", "view.json"]
                    .into_iter()
                    .chain(flag),
            );
            assert!(result.is_err(), "{} was accepted alongside --view-file", flag[0]);
        }
    }

    #[test]
    fn test_view_file_alone_is_accepted() {
        let cli = Cli::try_parse_from(["logtail", "tail", "--view-file", "view.json", "--backward"])
            .unwrap();
        match cli.command {
            Command::Tail(args) => {
                assert_eq!(args.view_file, Some(PathBuf::from("view.json")));
                assert!(args.sources.is_empty());
                assert!(args.backward);
            }
            Command::Probe(_) => panic!("expected tail"),
        }
    }

    #[test]
    fn test_tail_requires_a_source_without_view_file() {
        assert!(Cli::try_parse_from(["logtail", "tail"]).is_err());
        assert!(Cli::try_parse_from(["logtail", "tail", "--source", "api=1", "--team", "ops"]).is_ok());
    }
}
