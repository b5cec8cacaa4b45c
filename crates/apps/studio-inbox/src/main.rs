//! studio-inbox - operator CLI for the studio client inbox
//!
//! Drives the inbox crate against the SQLite store: list folders, apply
//! thread actions, compose and reply through Resend.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use inbox::{
    ActionHandler, ComposeRequest, Composer, InboundMail, InboxConfig, InboxStore, Mailbox,
    MailboxId, MailSender, MemoryMailSender, ReplyRequest, ReplySender, Signature,
    SqliteInboxStore, ThreadId, folder_counts, get_thread_detail, list_threads, record_inbound,
};
use log::{error, info};

mod cli;

use cli::{Cli, Command, MailboxCommand};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = InboxConfig::load()?;
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => settings.database_path()?,
    };
    let store: Arc<dyn InboxStore> = Arc::new(SqliteInboxStore::new(&db_path)?);
    info!("Using inbox database at {}", db_path.display());

    match cli.command {
        Command::List {
            folder,
            limit,
            offset,
        } => {
            for thread in list_threads(store.as_ref(), folder, limit, offset)? {
                println!(
                    "{}  {}{}  {:<24} {}  ({})",
                    thread.id,
                    if thread.unread { "*" } else { " " },
                    if thread.send_failed { "!" } else { " " },
                    thread.client_name,
                    thread.subject,
                    thread.updated_at.format("%Y-%m-%d %H:%M"),
                );
            }
        }
        Command::Counts => {
            let counts = folder_counts(store.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Command::Show { thread_id } => {
            let detail = get_thread_detail(store.as_ref(), &ThreadId::new(thread_id.as_str()))?
                .with_context(|| format!("Thread {} not found", thread_id))?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::Action { thread_id, action } => {
            let outcome = ActionHandler::new(store).apply_named(&ThreadId::new(thread_id), &action)?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Command::Compose(args) => {
            let from = args
                .from
                .or_else(|| settings.from_address.clone())
                .context("No sender given (use --from or set from_address)")?;
            let composer = Composer::new(store, mail_sender(&settings, cli.dry_run)?);
            let outcome = composer.compose(ComposeRequest {
                to: args.to,
                subject: args.subject,
                body: args.body,
                from,
                from_name: args.from_name.or_else(|| settings.from_name.clone()),
                attachments: args.attachments,
            })?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Reply(args) => {
            let from = args
                .from
                .or_else(|| settings.from_address.clone())
                .context("No sender given (use --from or set from_address)")?;
            let replies = ReplySender::new(store, mail_sender(&settings, cli.dry_run)?);
            let outcome = replies.reply(ReplyRequest {
                thread_id: ThreadId::new(args.thread_id),
                body: args.body,
                to: args.to,
                subject: args.subject,
                from,
                attachments: args.attachments,
            })?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Inbound(args) => {
            let thread_id = record_inbound(
                store.as_ref(),
                InboundMail {
                    from: args.from,
                    subject: args.subject,
                    body: args.body,
                    attachments: Vec::new(),
                    thread_id: args.thread.map(ThreadId::new),
                },
            )?;
            println!("{}", thread_id);
        }
        Command::Mailbox(MailboxCommand::Add { address, name }) => {
            let id = store
                .get_mailbox_by_address(&address)?
                .map(|existing| existing.id)
                .unwrap_or_else(MailboxId::generate);
            store.upsert_mailbox(Mailbox::new(id.clone(), address.as_str(), name))?;
            info!("Saved mailbox {} ({})", address, id.as_str());
        }
        Command::Mailbox(MailboxCommand::Signature { address, html, file }) => {
            let mailbox = store
                .get_mailbox_by_address(&address)?
                .with_context(|| format!("No mailbox registered for {}", address))?;
            let html = match (html, file) {
                (Some(html), _) => html,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read signature file: {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide --html or --file"),
            };
            store.save_signature(Signature {
                mailbox_id: mailbox.id,
                html,
            })?;
            info!("Saved signature for {}", address);
        }
    }

    Ok(())
}

/// Resend in normal runs, an in-memory recorder for --dry-run
fn mail_sender(settings: &InboxConfig, dry_run: bool) -> Result<Arc<dyn MailSender>> {
    if dry_run {
        info!("Dry run: mail will be recorded, not sent");
        return Ok(Arc::new(MemoryMailSender::new()));
    }
    if let Some(path) = InboxConfig::default_config_path() {
        log::debug!("Inbox config file: {}", path.display());
    }
    Ok(Arc::new(settings.resend_sender()?))
}
