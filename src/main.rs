use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use trello2keep::board::RawKind;
use trello2keep::config::{self, Config};
use trello2keep::credentials::{self, Credentials};
use trello2keep::encode::NoteStyle;
use trello2keep::keep::KeepClient;
use trello2keep::normalize::{ClosedPolicy, ItemMap, ListFilter};
use trello2keep::output;
use trello2keep::pipeline::{self, PipelineError, Selection, Source};
use trello2keep::trello::TrelloClient;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "trello2keep")]
#[command(about = "Export Trello lists to CSV, text, or Google Keep")]
#[command(long_about = "\
Export Trello lists to CSV, text, or Google Keep

SOURCE is a Trello board export (JSON) or, with --board, the name or id of a
board fetched live. LISTS are the names of the lists to export, matched
case-insensitively.

Board readings (--format):
  action-log   every card ever created in the list (default for files)
  snapshot     cards currently on the board (default for --board);
               closed lists and cards are skipped unless --include-closed

Secrets come from the credentials file (see 'credentials' in the config):
a Google service account key with an extra \"trello\" object holding
\"api_key\" and \"token\". TRELLO_API_KEY / TRELLO_TOKEN override the latter.

Run 'trello2keep gen-config' to generate a documented trello2keep.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Credentials file (overrides the config)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    ActionLog,
    Snapshot,
}

/// Shared flags for commands that read a board.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Board export file, or board name/id with --board
    source: String,

    /// Lists to export
    #[arg(required = true)]
    lists: Vec<String>,

    /// Treat SOURCE as a Trello board name or id and fetch it live
    #[arg(long)]
    board: bool,

    /// Which reading of the board to use
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Keep closed lists and cards of a snapshot
    #[arg(long)]
    include_closed: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Export list items to a CSV file
    Csv {
        #[command(flatten)]
        source: SourceArgs,
        /// Output file (defaults to output.csv_file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export list items to a plain-text file
    Text {
        #[command(flatten)]
        source: SourceArgs,
        /// Output file (defaults to output.text_file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create a Google Keep note from list items
    Note {
        #[command(flatten)]
        source: SourceArgs,
        /// Plain-text note instead of a checklist
        #[arg(long)]
        text: bool,
        /// Note title (defaults to the board or file name)
        #[arg(long)]
        title: Option<String>,
        /// User the service account acts for (overrides keep.impersonated_user)
        #[arg(long)]
        impersonate: Option<String>,
        /// Show the note without creating it
        #[arg(long)]
        dry_run: bool,
    },
    /// Save a live board snapshot as JSON
    Fetch {
        /// Board name or id
        board: String,
        /// Output file (defaults to output.snapshot_file)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include closed lists and cards
        #[arg(long)]
        include_closed: bool,
    },
    /// Print a stock trello2keep.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(kind = ?e.kind(), "run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "warn,trello2keep=info",
        _ => "info,trello2keep=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let ctx = Context {
        credentials_path: cli
            .credentials
            .unwrap_or_else(|| PathBuf::from(&config.credentials)),
        config,
    };

    match cli.command {
        Command::Csv {
            source,
            output: target,
        } => {
            let (_, _, map) = ctx.extract(&source)?;
            let path = target.unwrap_or_else(|| PathBuf::from(&ctx.config.output.csv_file));
            output::print_item_map(&map);
            let summary = pipeline::export_csv(&map, &path)?;
            output::print_export_summary(&summary);
        }
        Command::Text {
            source,
            output: target,
        } => {
            let (_, selection, map) = ctx.extract(&source)?;
            let path = target.unwrap_or_else(|| PathBuf::from(&ctx.config.output.text_file));
            output::print_item_map(&map);
            let summary = pipeline::export_text(&map, &selection.filter, &path)?;
            output::print_export_summary(&summary);
        }
        Command::Note {
            source,
            text,
            title,
            impersonate,
            dry_run,
        } => {
            let (source, selection, map) = ctx.extract(&source)?;
            let title = title.unwrap_or_else(|| source.default_title());
            let style = if text {
                NoteStyle::Text
            } else {
                NoteStyle::Checklist
            };
            output::print_item_map(&map);

            if dry_run {
                let note = pipeline::build_note(&title, &map, &selection.filter, style);
                output::print_note_preview(&note);
                return Ok(());
            }

            let credentials = ctx.credentials()?;
            let subject = impersonate.or_else(|| ctx.config.keep.impersonated_user.clone());
            let client = KeepClient::new(
                credentials.service_account()?.clone(),
                subject.as_deref(),
                &ctx.config.keep,
            )?;
            let created = pipeline::publish_note(&client, &title, &map, &selection.filter, style)?;
            output::print_note_created(&created);
        }
        Command::Fetch {
            board,
            output: target,
            include_closed,
        } => {
            let path = target.unwrap_or_else(|| PathBuf::from(&ctx.config.output.snapshot_file));
            let client = ctx.trello_client()?;
            let summary =
                pipeline::save_snapshot(&client, &board, closed_policy(include_closed), &path)?;
            output::print_snapshot_saved(&summary);
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

fn closed_policy(include_closed: bool) -> ClosedPolicy {
    if include_closed {
        ClosedPolicy::IgnoreStatus
    } else {
        ClosedPolicy::ExcludeClosed
    }
}

/// Resolved settings for one run.
struct Context {
    config: Config,
    credentials_path: PathBuf,
}

impl Context {
    fn credentials(&self) -> Result<Credentials, PipelineError> {
        Ok(credentials::load_credentials(
            &self.credentials_path,
            credentials::env_lookup,
        )?)
    }

    fn trello_client(&self) -> Result<TrelloClient, PipelineError> {
        let credentials = self.credentials()?;
        Ok(TrelloClient::new(
            credentials.trello()?,
            &self.config.trello,
        )?)
    }

    /// Read the source board and normalize the selected lists.
    fn extract(&self, args: &SourceArgs) -> Result<(Source, Selection, ItemMap), PipelineError> {
        let source = if args.board {
            Source::Board(args.source.clone())
        } else {
            Source::File(PathBuf::from(&args.source))
        };
        let kind = match args.format {
            Some(Format::ActionLog) => RawKind::ActionLog,
            Some(Format::Snapshot) => RawKind::Snapshot,
            None => source.default_kind(),
        };
        let selection = Selection::new(ListFilter::new(&args.lists), kind)
            .with_closed(closed_policy(args.include_closed));

        let value = match &source {
            Source::File(path) => pipeline::read_board_file(path)?,
            Source::Board(board) => {
                pipeline::fetch_board(&self.trello_client()?, board, &selection)?
            }
        };
        let map = pipeline::extract(&value, &selection)?;
        Ok((source, selection, map))
    }
}
