use std::{path::PathBuf, process::ExitCode, sync::Arc};

use admin_core::{
    AdminError, AdminSession, DispatchOutcome, FileCredentialStore, HttpRecordStore,
    RsvpSubmitter, SessionContext, SortColumn, SortDirection, SortSpec,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use shared::domain::{Attending, NewRsvp, RsvpId, RsvpStatus};
use tracing_subscriber::EnvFilter;

mod confirm;
mod render;

use confirm::StdinConfirmer;

#[derive(Parser, Debug)]
#[command(name = "wedding-admin", about = "Review and answer wedding RSVPs")]
struct Cli {
    #[arg(long, env = "WEDDING_SERVER_URL", default_value = "http://127.0.0.1:8787")]
    server_url: String,
    /// Credential file; defaults to the user's config directory.
    #[arg(long)]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the admin secret for later commands.
    Login {
        #[arg(long, env = "WEDDING_ADMIN_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
    Logout,
    /// Show one page of RSVPs.
    List {
        #[arg(long)]
        attending: Option<Attending>,
        #[arg(long)]
        status: Option<RsvpStatus>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "submittedAt")]
        sort: SortColumn,
        #[arg(long, value_enum, default_value_t = DirectionArg::Desc)]
        direction: DirectionArg,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    Details {
        id: String,
    },
    Approve {
        id: String,
    },
    Decline {
        id: String,
    },
    /// Submit an RSVP through the public endpoint.
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        attending: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        guests: Option<u32>,
        #[arg(long, default_value = "")]
        dietary: String,
        #[arg(long, default_value = "")]
        message: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Asc,
    Desc,
}

impl From<DirectionArg> for SortDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Asc => SortDirection::Asc,
            DirectionArg::Desc => SortDirection::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err.downcast_ref::<AdminError>(), Some(AdminError::Auth)) {
                eprintln!("error: {err}");
                eprintln!("hint: run `wedding-admin login` with the current admin secret");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        server_url,
        session_file,
        command,
    } = cli;

    match command {
        Command::Login { secret } => {
            let secret = match secret {
                Some(secret) => secret,
                None => read_secret().await?,
            };
            let mut session = open_session(&server_url, session_file)?;
            session.login(&secret)?;
            let count = session.load().await?;
            println!("Logged in. {count} RSVPs on record.");
        }
        Command::Logout => {
            open_session(&server_url, session_file)?.logout();
            println!("Logged out.");
        }
        Command::List {
            attending,
            status,
            search,
            sort,
            direction,
            page,
        } => {
            let mut session = open_session(&server_url, session_file)?;
            session.load().await?;
            session.set_attending_filter(attending);
            session.set_status_filter(status);
            session.set_search(search);
            session.set_sort(SortSpec {
                column: sort,
                direction: direction.into(),
            });
            session.go_to_page(page)?;
            println!(
                "{}",
                render::render_dashboard(&session.current_page(), session.stats(), session.criteria())
            );
        }
        Command::Details { id } => {
            let mut session = open_session(&server_url, session_file)?;
            session.load().await?;
            println!("{}", session.details(&RsvpId(id))?);
        }
        Command::Approve { id } => {
            let mut session = open_session(&server_url, session_file)?;
            session.load().await?;
            let outcome = session.approve(&RsvpId(id), Arc::new(StdinConfirmer)).await?;
            report(outcome, "Confirmation email sent!");
        }
        Command::Decline { id } => {
            let mut session = open_session(&server_url, session_file)?;
            session.load().await?;
            let outcome = session.decline(&RsvpId(id), Arc::new(StdinConfirmer)).await?;
            report(outcome, "Decline email sent!");
        }
        Command::Submit {
            name,
            email,
            attending,
            phone,
            guests,
            dietary,
            message,
        } => {
            let response = RsvpSubmitter::new(&server_url)?
                .submit(&NewRsvp {
                    name,
                    email,
                    phone,
                    attending: Some(attending),
                    guests,
                    dietary,
                    message,
                })
                .await?;
            println!("{} (id {})", response.message, response.id);
        }
    }
    Ok(())
}

fn open_session(server_url: &str, session_file: Option<PathBuf>) -> Result<AdminSession> {
    let path = match session_file {
        Some(path) => path,
        None => FileCredentialStore::default_path()?,
    };
    let store = HttpRecordStore::new(server_url)?;
    let context = SessionContext::init(Box::new(FileCredentialStore::new(path)));
    Ok(AdminSession::new(Arc::new(store), context))
}

fn report(outcome: DispatchOutcome, applied: &str) {
    if outcome.was_applied() {
        println!("{applied}");
    }
    match outcome {
        DispatchOutcome::Applied => {}
        DispatchOutcome::AppliedReloadFailed(err) => {
            eprintln!("warning: could not refresh the RSVP list: {err}");
        }
        DispatchOutcome::Cancelled => println!("Cancelled; nothing was sent."),
    }
}

async fn read_secret() -> Result<String> {
    tokio::task::spawn_blocking(|| -> std::io::Result<String> {
        use std::io::{BufRead, Write};
        let mut stdout = std::io::stdout();
        write!(stdout, "Admin secret: ")?;
        stdout.flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .context("secret prompt task failed")?
    .context("failed to read admin secret")
}
