#![deny(clippy::unwrap_used, clippy::expect_used)]

mod app;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod registry;
pub mod render;
pub mod rich_text;
pub mod staging;
pub mod upload;

pub use app::AppEvent;
pub use app::AppEventRx;
pub use app::AppEventTx;
pub use app::Notice;
pub use app::NoticeLevel;
pub use app::Session;
pub use app::SharedBackend;
pub use cli::Cli;
pub use config::SessionConfig;

use std::io::IsTerminal;
use std::sync::Arc;

use cli::Command;
use conversation::Sender;
use conversation::SubmitOutcome;
use kbase_client::HttpClient;
use kbase_client::MockClient;
use staging::Candidate;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload::CommitOutcome;

const DEFAULT_WIDTH: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Entry point for the `kbase` binary.
pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let default_level = "error";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();

    let config = cli.apply(SessionConfig::from_env()?)?;
    let use_mock = cli.mock || config::mock_mode_from_env();
    let backend: SharedBackend = if use_mock {
        Arc::new(MockClient::new())
    } else {
        Arc::new(
            HttpClient::new(config.base_url.clone())?
                .with_user_agent(config.user_agent.clone())
                .with_path_style(config.path_style),
        )
    };
    info!(
        "startup: base_url={} path_style={:?} mock={use_mock}",
        config.base_url, config.path_style
    );

    let width = std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(DEFAULT_WIDTH);
    let mut session = Session::new(backend, &config);
    session.start();
    if !cli.files.is_empty() {
        stage_paths(&mut session, &cli.files);
    }
    println!("{}", cli::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_line(&mut session, &line) == Flow::Quit {
                    break;
                }
            }
            Some(event) = session.next_event() => {
                let seen = session.conversation().messages().len();
                let files_event = matches!(event, AppEvent::FilesLoaded { .. });
                session.handle_event(event);
                for message in &session.conversation().messages()[seen..] {
                    if message.sender() == Sender::Assistant {
                        print_lines(render::render_message(message, width));
                    }
                }
                for notice in session.drain_notices() {
                    match notice.level {
                        NoticeLevel::Success => println!("✓ {}", notice.message),
                        NoticeLevel::Error => println!("✗ {}", notice.message),
                    }
                }
                if files_event && !session.registry().is_loading() {
                    print_lines(render::render_registry(session.registry().view()));
                }
            }
        }
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn stage_paths(session: &mut Session, paths: &[std::path::PathBuf]) {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        match Candidate::from_path(path) {
            Ok(candidate) => candidates.push(candidate),
            Err(err) => println!("✗ {}: {err}", path.display()),
        }
    }
    for rejection in session.add_candidates(candidates) {
        println!("✗ {rejection}");
    }
    print_lines(render::render_staged(session.staging()));
}

fn handle_line(session: &mut Session, line: &str) -> Flow {
    if let Some(name) = session.registry().pending_delete().map(str::to_string) {
        if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            if session.confirm_delete().is_some() {
                println!("Deleting {name}…");
            }
        } else {
            session.cancel_delete();
            println!("Kept {name}.");
        }
        return Flow::Continue;
    }

    match cli::parse_command(line) {
        Command::Ask(question) => match session.submit(&question) {
            SubmitOutcome::Submitted { .. } => println!("{}", render::THINKING),
            SubmitOutcome::Busy => println!("Still waiting for the previous answer."),
            SubmitOutcome::Blank => {}
        },
        Command::Add(paths) => stage_paths(session, &paths),
        Command::Remove(index) => match session.remove_candidate(index) {
            Some(file) => println!("Unstaged {}.", file.name),
            None => println!("No staged file at index {index}."),
        },
        Command::Staged => print_lines(render::render_staged(session.staging())),
        Command::Clear => {
            session.clear_staged();
            println!("Staging cleared.");
        }
        Command::Upload => match session.commit_upload() {
            CommitOutcome::Started { file_count, .. } => {
                println!("Uploading {file_count} file(s)…");
            }
            CommitOutcome::NothingStaged => {
                if let Some(hint) = session.uploader().hint() {
                    println!("{hint}");
                }
            }
            CommitOutcome::Busy => println!("An upload is already in progress."),
        },
        Command::Files => {
            session.retry_files();
            print_lines(render::render_registry(session.registry().view()));
        }
        Command::Delete(name) => {
            if session.request_delete(&name) {
                println!("Delete {name} from the server? [y/N]");
            } else {
                println!("No file named {name}.");
            }
        }
        Command::Transcript => println!("{}", session.conversation().transcript()),
        Command::Help => println!("{}", cli::HELP),
        Command::Quit => return Flow::Quit,
        Command::Usage(usage) => println!("usage: {usage}"),
        Command::Unknown(name) => println!("Unknown command :{name}. Type :help."),
    }
    Flow::Continue
}
