//! In-memory storage implementation
//!
//! Used in tests and by callers that don't need durability. Every mutating
//! call that touches a record bumps a write counter, so tests can assert how
//! many persisted writes an operation performed.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{InboxStore, ThreadPatch};
use crate::models::{Mailbox, MailboxId, Message, Signature, Thread, ThreadId, ThreadStatus};

/// In-memory implementation of InboxStore
///
/// Uses HashMaps protected by RwLocks for thread-safe access.
pub struct InMemoryInboxStore {
    threads: RwLock<HashMap<String, Thread>>,
    /// thread_id -> messages in append order
    messages: RwLock<HashMap<String, Vec<Message>>>,
    mailboxes: RwLock<HashMap<String, Mailbox>>,
    /// mailbox_id -> signature
    signatures: RwLock<HashMap<String, Signature>>,
    writes: AtomicUsize,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| anyhow!("{} lock poisoned", what))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| anyhow!("{} lock poisoned", what))
}

impl InMemoryInboxStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            mailboxes: RwLock::new(HashMap::new()),
            signatures: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of persisted writes (inserts, updates, deletes, appends) so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryInboxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InboxStore for InMemoryInboxStore {
    fn insert_thread(&self, thread: Thread) -> Result<()> {
        let mut threads = write(&self.threads, "threads")?;
        threads.insert(thread.id.0.clone(), thread);
        self.record_write();
        Ok(())
    }

    fn insert_thread_with_message(&self, thread: Thread, message: Message) -> Result<()> {
        if message.thread_id != thread.id {
            return Err(anyhow!(
                "Message {} belongs to thread {}, not {}",
                message.id.as_str(),
                message.thread_id.as_str(),
                thread.id.as_str()
            ));
        }

        // Both locks held so readers never see the thread without its message
        let mut threads = write(&self.threads, "threads")?;
        let mut messages = write(&self.messages, "messages")?;
        messages.entry(thread.id.0.clone()).or_default().push(message);
        threads.insert(thread.id.0.clone(), thread);
        self.record_write();
        Ok(())
    }

    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        let threads = read(&self.threads, "threads")?;
        Ok(threads.get(&id.0).cloned())
    }

    fn update_thread(&self, id: &ThreadId, patch: &ThreadPatch) -> Result<bool> {
        let mut threads = write(&self.threads, "threads")?;
        let Some(thread) = threads.get_mut(&id.0) else {
            return Ok(false);
        };
        patch.apply_to(thread);
        self.record_write();
        Ok(true)
    }

    fn delete_thread(&self, id: &ThreadId) -> Result<bool> {
        let mut threads = write(&self.threads, "threads")?;
        if threads.remove(&id.0).is_none() {
            return Ok(false);
        }
        drop(threads);

        // Messages have no lifecycle of their own
        write(&self.messages, "messages")?.remove(&id.0);
        self.record_write();
        Ok(true)
    }

    fn list_threads(
        &self,
        status: ThreadStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Thread>> {
        let threads = read(&self.threads, "threads")?;
        let mut thread_list: Vec<_> = threads
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();

        // Newest first; ID as tie-breaker keeps pagination stable
        thread_list.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });

        Ok(thread_list.into_iter().skip(offset).take(limit).collect())
    }

    fn count_threads(&self, status: ThreadStatus) -> Result<usize> {
        let threads = read(&self.threads, "threads")?;
        Ok(threads.values().filter(|t| t.status == status).count())
    }

    fn count_unread(&self, status: ThreadStatus) -> Result<usize> {
        let threads = read(&self.threads, "threads")?;
        Ok(threads
            .values()
            .filter(|t| t.status == status && t.unread)
            .count())
    }

    fn has_thread(&self, id: &ThreadId) -> Result<bool> {
        let threads = read(&self.threads, "threads")?;
        Ok(threads.contains_key(&id.0))
    }

    fn append_message(&self, message: Message) -> Result<()> {
        if !self.has_thread(&message.thread_id)? {
            return Err(anyhow!(
                "Cannot append message {} to missing thread {}",
                message.id.as_str(),
                message.thread_id.as_str()
            ));
        }

        let mut messages = write(&self.messages, "messages")?;
        messages
            .entry(message.thread_id.0.clone())
            .or_default()
            .push(message);
        self.record_write();
        Ok(())
    }

    fn list_messages_for_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        let messages = read(&self.messages, "messages")?;
        Ok(messages.get(&thread_id.0).cloned().unwrap_or_default())
    }

    fn upsert_mailbox(&self, mailbox: Mailbox) -> Result<()> {
        let mut mailboxes = write(&self.mailboxes, "mailboxes")?;
        mailboxes.insert(mailbox.id.0.clone(), mailbox);
        self.record_write();
        Ok(())
    }

    fn get_mailbox_by_address(&self, address: &str) -> Result<Option<Mailbox>> {
        let mailboxes = read(&self.mailboxes, "mailboxes")?;
        let address = address.trim();
        Ok(mailboxes
            .values()
            .find(|m| m.address.eq_ignore_ascii_case(address))
            .cloned())
    }

    fn save_signature(&self, signature: Signature) -> Result<()> {
        let mut signatures = write(&self.signatures, "signatures")?;
        signatures.insert(signature.mailbox_id.0.clone(), signature);
        self.record_write();
        Ok(())
    }

    fn get_signature(&self, mailbox_id: &MailboxId) -> Result<Option<Signature>> {
        let signatures = read(&self.signatures, "signatures")?;
        Ok(signatures.get(&mailbox_id.0).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailAddress, MessageId};
    use chrono::{Duration, Utc};

    fn make_thread(id: &str, status: ThreadStatus, age_hours: i64) -> Thread {
        let at = Utc::now() - Duration::hours(age_hours);
        Thread::new(
            ThreadId::new(id),
            &EmailAddress::new("client@example.com"),
            format!("Subject {}", id),
            status,
            at,
        )
    }

    #[test]
    fn test_list_threads_filters_and_orders() {
        let store = InMemoryInboxStore::new();
        store.insert_thread(make_thread("old", ThreadStatus::Inbox, 5)).unwrap();
        store.insert_thread(make_thread("new", ThreadStatus::Inbox, 1)).unwrap();
        store.insert_thread(make_thread("gone", ThreadStatus::Trash, 0)).unwrap();

        let inbox = store.list_threads(ThreadStatus::Inbox, 10, 0).unwrap();
        let ids: Vec<_> = inbox.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let page = store.list_threads(ThreadStatus::Inbox, 1, 1).unwrap();
        assert_eq!(page[0].id.as_str(), "old");
        assert_eq!(store.count_threads(ThreadStatus::Trash).unwrap(), 1);
    }

    #[test]
    fn test_update_missing_thread_is_not_a_write() {
        let store = InMemoryInboxStore::new();
        let found = store
            .update_thread(&ThreadId::new("nope"), &ThreadPatch::unread(false))
            .unwrap();
        assert!(!found);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_messages_keep_append_order() {
        let store = InMemoryInboxStore::new();
        store.insert_thread(make_thread("t1", ThreadStatus::Inbox, 0)).unwrap();

        let now = Utc::now();
        // Later message appended first; order must follow appends, not timestamps
        for (id, offset) in [("m1", 10), ("m2", 0)] {
            let msg = Message::builder(MessageId::new(id), ThreadId::new("t1"))
                .body(id)
                .sent_at(now - Duration::minutes(offset))
                .build();
            store.append_message(msg).unwrap();
        }

        let messages = store.list_messages_for_thread(&ThreadId::new("t1")).unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_thread_with_message_is_one_write() {
        let store = InMemoryInboxStore::new();
        let thread = make_thread("t1", ThreadStatus::Sent, 0);
        let msg = Message::builder(MessageId::new("m1"), thread.id.clone()).build();

        store.insert_thread_with_message(thread.clone(), msg).unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(store.has_thread(&thread.id).unwrap());
        assert_eq!(store.list_messages_for_thread(&thread.id).unwrap().len(), 1);
    }

    #[test]
    fn test_thread_with_foreign_message_is_rejected() {
        let store = InMemoryInboxStore::new();
        let thread = make_thread("t1", ThreadStatus::Sent, 0);
        let msg = Message::builder(MessageId::new("m1"), ThreadId::new("other")).build();

        assert!(store.insert_thread_with_message(thread.clone(), msg).is_err());
        assert!(!store.has_thread(&thread.id).unwrap());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_append_to_missing_thread_fails() {
        let store = InMemoryInboxStore::new();
        let msg = Message::builder(MessageId::new("m1"), ThreadId::new("ghost")).build();
        assert!(store.append_message(msg).is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_mailbox_lookup_is_case_insensitive() {
        let store = InMemoryInboxStore::new();
        store
            .upsert_mailbox(Mailbox::new(MailboxId::new("mb1"), "Hello@Studio.dev", None))
            .unwrap();
        let found = store.get_mailbox_by_address("hello@studio.dev").unwrap();
        assert_eq!(found.unwrap().id, MailboxId::new("mb1"));
        assert!(store.get_mailbox_by_address("other@studio.dev").unwrap().is_none());
    }
}
