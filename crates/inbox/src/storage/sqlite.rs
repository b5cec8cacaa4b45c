//! SQLite-based inbox storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::{InboxStore, ThreadPatch};
use crate::models::{
    Attachment, Direction, Mailbox, MailboxId, Message, MessageId, Signature, Thread, ThreadId,
    ThreadStatus,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE threads (
                id TEXT PRIMARY KEY,
                client_email TEXT NOT NULL,
                client_name TEXT,
                subject TEXT NOT NULL,
                status TEXT NOT NULL
                    CHECK (status IN ('inbox', 'sent', 'archive', 'trash', 'spam')),
                starred INTEGER NOT NULL DEFAULT 0,
                unread INTEGER NOT NULL DEFAULT 0,
                send_failed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX idx_threads_status_updated
                ON threads(status, updated_at DESC);

            -- seq preserves append order within a thread
            CREATE TABLE messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                thread_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                direction TEXT NOT NULL CHECK (direction IN ('inbound', 'outbound')),
                body TEXT NOT NULL,
                attachments TEXT NOT NULL DEFAULT '[]',
                sent_at TEXT NOT NULL,
                FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_messages_thread ON messages(thread_id, seq);

            CREATE TABLE mailboxes (
                id TEXT PRIMARY KEY,
                address TEXT NOT NULL UNIQUE COLLATE NOCASE,
                display_name TEXT
            );

            CREATE TABLE signatures (
                mailbox_id TEXT PRIMARY KEY,
                html TEXT NOT NULL,
                FOREIGN KEY (mailbox_id) REFERENCES mailboxes(id) ON DELETE CASCADE
            );
            "#,
        ),
    ])
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const THREAD_COLUMNS: &str = "id, client_email, client_name, subject, status, starred, unread, \
                              send_failed, created_at, updated_at";

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<Thread> {
    let status: String = row.get(4)?;
    let status = status
        .parse::<ThreadStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Thread {
        id: ThreadId::new(row.get::<_, String>(0)?),
        client_email: row.get(1)?,
        client_name: row.get(2)?,
        subject: row.get(3)?,
        status,
        starred: row.get(5)?,
        unread: row.get(6)?,
        send_failed: row.get(7)?,
        created_at: parse_timestamp(8, &created_at)?,
        updated_at: parse_timestamp(9, &updated_at)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let direction = match row.get::<_, String>(3)?.as_str() {
        "inbound" => Direction::Inbound,
        "outbound" => Direction::Outbound,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown direction: {}", other).into(),
            ));
        }
    };
    let attachments: String = row.get(5)?;
    let attachments: Vec<Attachment> = serde_json::from_str(&attachments)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let sent_at: String = row.get(6)?;

    Ok(Message {
        id: MessageId::new(row.get::<_, String>(0)?),
        thread_id: ThreadId::new(row.get::<_, String>(1)?),
        sender: row.get(2)?,
        direction,
        body: row.get(4)?,
        attachments,
        sent_at: parse_timestamp(6, &sent_at)?,
    })
}

fn insert_thread_row(conn: &Connection, thread: &Thread) -> Result<()> {
    // ON CONFLICT DO UPDATE rather than INSERT OR REPLACE: REPLACE deletes
    // the old row first, which would cascade to the thread's messages.
    conn.execute(
        "INSERT INTO threads
         (id, client_email, client_name, subject, status, starred, unread,
          send_failed, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            client_email = excluded.client_email,
            client_name = excluded.client_name,
            subject = excluded.subject,
            status = excluded.status,
            starred = excluded.starred,
            unread = excluded.unread,
            send_failed = excluded.send_failed,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at",
        params![
            thread.id.as_str(),
            thread.client_email,
            thread.client_name,
            thread.subject,
            thread.status.as_str(),
            thread.starred,
            thread.unread,
            thread.send_failed,
            format_timestamp(&thread.created_at),
            format_timestamp(&thread.updated_at),
        ],
    )
    .with_context(|| format!("Failed to insert thread {}", thread.id))?;
    Ok(())
}

fn insert_message_row(conn: &Connection, message: &Message) -> Result<()> {
    let attachments = serde_json::to_string(&message.attachments)?;
    conn.execute(
        "INSERT INTO messages (id, thread_id, sender, direction, body, attachments, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.id.as_str(),
            message.thread_id.as_str(),
            message.sender,
            message.direction.as_str(),
            message.body,
            attachments,
            format_timestamp(&message.sent_at),
        ],
    )
    .with_context(|| {
        format!(
            "Failed to append message {} to thread {}",
            message.id.as_str(),
            message.thread_id
        )
    })?;
    Ok(())
}

/// SQLite-based inbox storage
///
/// A single connection behind a mutex; callers share the store via `Arc`.
pub struct SqliteInboxStore {
    conn: Mutex<Connection>,
}

impl SqliteInboxStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // WAL lets readers continue during writes; foreign_keys is required
        // for ON DELETE CASCADE on messages and signatures.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }
}

impl InboxStore for SqliteInboxStore {
    fn insert_thread(&self, thread: Thread) -> Result<()> {
        let conn = self.conn()?;
        insert_thread_row(&conn, &thread)
    }

    fn insert_thread_with_message(&self, thread: Thread, message: Message) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        insert_thread_row(&tx, &thread)?;
        insert_message_row(&tx, &message)?;
        tx.commit()
            .with_context(|| format!("Failed to commit thread {}", thread.id))?;
        Ok(())
    }

    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        let conn = self.conn()?;
        let thread = conn
            .query_row(
                &format!("SELECT {} FROM threads WHERE id = ?1", THREAD_COLUMNS),
                [id.as_str()],
                thread_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load thread {}", id))?;
        Ok(thread)
    }

    fn update_thread(&self, id: &ThreadId, patch: &ThreadPatch) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE threads SET
                    status = COALESCE(?1, status),
                    unread = COALESCE(?2, unread),
                    starred = COALESCE(?3, starred),
                    send_failed = COALESCE(?4, send_failed),
                    updated_at = COALESCE(?5, updated_at)
                 WHERE id = ?6",
                params![
                    patch.status.map(|s| s.as_str()),
                    patch.unread,
                    patch.starred,
                    patch.send_failed,
                    patch.updated_at.as_ref().map(format_timestamp),
                    id.as_str(),
                ],
            )
            .with_context(|| format!("Failed to update thread {}", id))?;
        Ok(changed > 0)
    }

    fn delete_thread(&self, id: &ThreadId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM threads WHERE id = ?1", [id.as_str()])
            .with_context(|| format!("Failed to delete thread {}", id))?;
        Ok(deleted > 0)
    }

    fn list_threads(
        &self,
        status: ThreadStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Thread>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM threads WHERE status = ?1
             ORDER BY updated_at DESC, id ASC
             LIMIT ?2 OFFSET ?3",
            THREAD_COLUMNS
        ))?;

        let threads = stmt
            .query_map(
                params![status.as_str(), limit as i64, offset as i64],
                thread_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list {} threads", status))?;

        Ok(threads)
    }

    fn count_threads(&self, status: ThreadStatus) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM threads WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_unread(&self, status: ThreadStatus) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM threads WHERE status = ?1 AND unread = 1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn has_thread(&self, id: &ThreadId) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM threads WHERE id = ?1)",
            [id.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn append_message(&self, message: Message) -> Result<()> {
        let conn = self.conn()?;
        insert_message_row(&conn, &message)
    }

    fn list_messages_for_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, sender, direction, body, attachments, sent_at
             FROM messages WHERE thread_id = ?1
             ORDER BY seq ASC",
        )?;

        let messages = stmt
            .query_map([thread_id.as_str()], message_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list messages for thread {}", thread_id))?;

        Ok(messages)
    }

    fn upsert_mailbox(&self, mailbox: Mailbox) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO mailboxes (id, address, display_name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                address = excluded.address,
                display_name = excluded.display_name",
            params![mailbox.id.as_str(), mailbox.address.trim(), mailbox.display_name],
        )
        .with_context(|| format!("Failed to save mailbox {}", mailbox.address))?;
        Ok(())
    }

    fn get_mailbox_by_address(&self, address: &str) -> Result<Option<Mailbox>> {
        let conn = self.conn()?;
        let mailbox = conn
            .query_row(
                "SELECT id, address, display_name FROM mailboxes WHERE address = ?1",
                [address.trim()],
                |row| {
                    Ok(Mailbox {
                        id: MailboxId::new(row.get::<_, String>(0)?),
                        address: row.get(1)?,
                        display_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(mailbox)
    }

    fn save_signature(&self, signature: Signature) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signatures (mailbox_id, html) VALUES (?1, ?2)
             ON CONFLICT(mailbox_id) DO UPDATE SET html = excluded.html",
            params![signature.mailbox_id.as_str(), signature.html],
        )
        .with_context(|| {
            format!(
                "Failed to save signature for mailbox {}",
                signature.mailbox_id.as_str()
            )
        })?;
        Ok(())
    }

    fn get_signature(&self, mailbox_id: &MailboxId) -> Result<Option<Signature>> {
        let conn = self.conn()?;
        let html: Option<String> = conn
            .query_row(
                "SELECT html FROM signatures WHERE mailbox_id = ?1",
                [mailbox_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(html.map(|html| Signature {
            mailbox_id: mailbox_id.clone(),
            html,
        }))
    }
}
