//! Relay - command-line and webhook entry point for mailsheet
//!
//! Scheduled jobs call the sync subcommands directly; external callers go
//! through `serve`, which accepts token-checked trigger requests.

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use mailsheet::{
    GmailAuth, GmailClient, GmailCredentials, MailsheetService, Settings, SortOrder,
    SqliteSheetStore, SyncError, TriggerResponse,
};

mod http;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep a ledger of Gmail messages, one row per message")]
struct Cli {
    /// SQLite database holding the sheet (overrides settings)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for trigger requests
    Serve {
        /// Address to bind (overrides settings)
        #[arg(long)]
        listen: Option<String>,
    },
    /// Rebuild the sheet (resumes a paused rescan)
    FullRescan,
    /// Add missing messages without clearing
    Backfill,
    /// Apply changes since the last run
    Incremental,
    /// Forget cursors and the dedup index
    ClearHistory,
    /// Sort rows by date
    Sort {
        #[arg(value_enum)]
        order: SortArg,
    },
    /// Prepare the sheet, store the run token, backfill
    Setup,
    /// Sign in to Gmail and show the mailbox profile
    Authorize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SortArg {
    #[value(alias = "ascending")]
    Asc,
    #[value(alias = "descending")]
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SortOrder::Ascending,
            SortArg::Desc => SortOrder::Descending,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    if let Command::Serve {
        listen: Some(addr),
    } = &cli.command
    {
        settings.listen_addr = addr.clone();
    }
    let service = build_service(settings)?;

    match cli.command {
        Command::Serve { .. } => serve(&service),
        Command::FullRescan => service.full_rescan().map(|_| ()),
        Command::Backfill => service.backfill().map(|_| ()),
        Command::Incremental => service.incremental().map(|_| ()),
        Command::ClearHistory => service.clear_history_and_index().map(|_| ()),
        Command::Sort { order } => service.sort(order.into()),
        Command::Setup => service.setup().map(|_| ()),
        Command::Authorize => {
            let profile = service.authorize()?;
            println!("{} (history {})", profile.email_address, profile.history_id);
            Ok(())
        }
    }
}

fn build_service(settings: Settings) -> Result<MailsheetService> {
    let credentials = GmailCredentials::load().map_err(|e| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            warn!("Place your Google OAuth credentials at: {}", path.display());
        }
        e
    })?;

    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = SqliteSheetStore::new(&settings.database_path)?;
    let client = GmailClient::new(GmailAuth::new(credentials)?);

    Ok(MailsheetService::new(
        Arc::new(client),
        Arc::new(store),
        settings,
    ))
}

/// Accept trigger requests one at a time
///
/// Runs execute on the accepting thread, so a second trigger waits until the
/// current run finishes. Reads and writes time out after [`http::IO_TIMEOUT`]
/// so an idle client cannot hold the listener.
fn serve(service: &MailsheetService) -> Result<()> {
    let addr = service.settings().listen_addr.clone();
    let listener =
        TcpListener::bind(&addr).with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening for triggers on {}", addr);

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        if let Err(e) = http::set_timeouts(&stream, http::IO_TIMEOUT) {
            warn!("{:#}", e);
            continue;
        }

        let (status, json) = match http::read_request(&stream) {
            Ok(request) => {
                let response = service.handle_trigger(&request);
                let unauthorized = SyncError::Unauthorized.to_string();
                let status = if response.error.as_deref() == Some(unauthorized.as_str()) {
                    "401 Unauthorized"
                } else {
                    "200 OK"
                };
                (status, response.to_json())
            }
            Err(e) => {
                warn!("Bad trigger request: {:#}", e);
                (
                    "400 Bad Request",
                    TriggerResponse::failed("bad request").to_json(),
                )
            }
        };

        if let Err(e) = http::write_json(&mut stream, status, &json) {
            warn!("{:#}", e);
        }
    }

    Ok(())
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
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["relay", "full-rescan"]).unwrap();
        assert!(matches!(cli.command, Command::FullRescan));

        let cli = Cli::try_parse_from(["relay", "clear-history", "--database", "/tmp/x.db"]).unwrap();
        assert!(matches!(cli.command, Command::ClearHistory));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));

        let cli = Cli::try_parse_from(["relay", "serve", "--listen", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve { listen } => assert_eq!(listen.as_deref(), Some("0.0.0.0:9000")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sort_order_argument() {
        let cli = Cli::try_parse_from(["relay", "sort", "desc"]).unwrap();
        match cli.command {
            Command::Sort { order } => assert_eq!(SortOrder::from(order), SortOrder::Descending),
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::try_parse_from(["relay", "sort", "ascending"]).unwrap();
        assert!(matches!(cli.command, Command::Sort { order: SortArg::Asc }));

        assert!(Cli::try_parse_from(["relay", "sort"]).is_err());
        assert!(Cli::try_parse_from(["relay", "sort", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["relay", "explode"]).is_err());
    }
}
