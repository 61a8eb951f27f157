use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::ValueEnum;
use kbase_client::PathStyle;

use crate::config::SessionConfig;

#[derive(Debug, Default, Parser)]
#[command(name = "kbase", version, about = "Ask questions about your uploaded documents")]
pub struct Cli {
    /// Backend base URL (overrides KBASE_BASE_URL).
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Which file-listing endpoint the server exposes.
    #[arg(long = "path-style", value_enum, value_name = "STYLE")]
    pub path_style: Option<PathStyleArg>,

    /// Use the in-memory backend instead of a server.
    #[arg(long)]
    pub mock: bool,

    /// Seconds to wait for an answer.
    #[arg(long = "query-timeout", value_name = "SECS")]
    pub query_timeout: Option<u64>,

    /// Files to stage before the prompt appears.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PathStyleArg {
    Documents,
    Files,
}

impl From<PathStyleArg> for PathStyle {
    fn from(value: PathStyleArg) -> Self {
        match value {
            PathStyleArg::Documents => PathStyle::Documents,
            PathStyleArg::Files => PathStyle::Files,
        }
    }
}

impl Cli {
    /// Layer command-line flags over an environment-derived config.
    pub fn apply(&self, config: SessionConfig) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.base_url {
            Some(url) => config.with_base_url(url)?,
            None => config,
        };
        if let Some(style) = self.path_style {
            config.path_style = style.into();
        }
        if let Some(secs) = self.query_timeout {
            config.query_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// One line of REPL input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Add(Vec<PathBuf>),
    Remove(usize),
    Staged,
    Clear,
    Upload,
    Files,
    Delete(String),
    Transcript,
    Help,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

pub const HELP: &str = "\
Type a question and press Enter to ask it.
  :add <path>...   stage files for upload (.pdf .txt .doc .docx, 10 MB max)
  :rm <index>      unstage a file
  :staged          list staged files
  :clear           unstage everything
  :upload          upload the staged files
  :files           refresh and show the server's files
  :delete <name>   delete a file from the server
  :transcript      print the conversation so far
  :help            show this help
  :quit            exit";

pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.trim_start().strip_prefix(':') else {
        return Command::Ask(line.to_string());
    };
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest.trim_end(), ""),
    };
    match name {
        "add" if args.is_empty() => Command::Usage(":add <path>..."),
        "add" => Command::Add(args.split_whitespace().map(PathBuf::from).collect()),
        "rm" => match args.parse() {
            Ok(index) => Command::Remove(index),
            Err(_) => Command::Usage(":rm <index>"),
        },
        "staged" => Command::Staged,
        "clear" => Command::Clear,
        "upload" => Command::Upload,
        "files" => Command::Files,
        "delete" if args.is_empty() => Command::Usage(":delete <name>"),
        "delete" => Command::Delete(args.to_string()),
        "transcript" => Command::Transcript,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}
