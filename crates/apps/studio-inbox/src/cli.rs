//! Command-line definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use inbox::{Attachment, ThreadStatus};

#[derive(Parser)]
#[command(name = "studio-inbox", about = "Manage the studio client inbox")]
pub struct Cli {
    /// Path to the SQLite database (default: ~/.config/studio/inbox.sqlite)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Record outgoing mail instead of sending it through Resend
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List threads in a folder
    List {
        #[arg(long, default_value = "inbox", value_parser = parse_folder)]
        folder: ThreadStatus,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Show thread counts per folder
    Counts,
    /// Print a thread and its messages as JSON
    Show { thread_id: String },
    /// Apply an action (archive, trash, restore, spam, toggleRead, markAsRead, delete)
    Action { thread_id: String, action: String },
    /// Start a new conversation
    Compose(ComposeArgs),
    /// Reply inside an existing thread
    Reply(ReplyArgs),
    /// File an inbound email
    Inbound(InboundArgs),
    /// Manage sending mailboxes
    #[command(subcommand)]
    Mailbox(MailboxCommand),
}

#[derive(Args)]
pub struct ComposeArgs {
    #[arg(long)]
    pub to: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub body: String,
    /// Sender address (default: configured from_address)
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub from_name: Option<String>,
    /// Attachment as name=url, repeatable
    #[arg(long = "attach", value_parser = parse_attachment)]
    pub attachments: Vec<Attachment>,
}

#[derive(Args)]
pub struct ReplyArgs {
    pub thread_id: String,
    #[arg(long)]
    pub to: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub body: String,
    /// Mailbox address to reply from (default: configured from_address)
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long = "attach", value_parser = parse_attachment)]
    pub attachments: Vec<Attachment>,
}

#[derive(Args)]
pub struct InboundArgs {
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub body: String,
    /// Existing thread this mail answers
    #[arg(long)]
    pub thread: Option<String>,
}

#[derive(Subcommand)]
pub enum MailboxCommand {
    /// Register (or rename) a sending mailbox
    Add {
        address: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Set the HTML signature for a mailbox
    Signature {
        address: String,
        /// Signature HTML
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        html: Option<String>,
        /// Read the signature HTML from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn parse_folder(s: &str) -> Result<ThreadStatus, String> {
    s.parse::<ThreadStatus>().map_err(|e| e.to_string())
}

fn parse_attachment(s: &str) -> Result<Attachment, String> {
    let (name, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=url, got {}", s))?;
    if name.trim().is_empty() || url.trim().is_empty() {
        return Err(format!("expected name=url, got {}", s));
    }
    Ok(Attachment::new(name.trim(), url.trim()))
}
