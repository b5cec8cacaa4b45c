//! Integration tests for the inbox crate
//!
//! These tests drive the public API end to end against both store backends.

use std::sync::Arc;

use inbox::models::{Direction, Mailbox, MailboxId, Signature, ThreadId, ThreadStatus};
use inbox::query::{folder_counts, get_thread_detail, list_threads};
use inbox::send::{MailBody, MemoryMailSender};
use inbox::storage::{InMemoryInboxStore, InboxStore, SqliteInboxStore};
use inbox::{
    ActionHandler, ActionOutcome, ComposeRequest, Composer, InboundMail, InboxError, ReplyRequest,
    ReplySender, ThreadAction, record_inbound,
};
use tempfile::TempDir;

fn compose_request() -> ComposeRequest {
    ComposeRequest {
        to: "client@x.com".to_string(),
        subject: "Hello".to_string(),
        body: "Hi there".to_string(),
        from: "hello@studio.dev".to_string(),
        from_name: Some("Studio".to_string()),
        attachments: Vec::new(),
    }
}

fn sqlite_store() -> (Arc<SqliteInboxStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteInboxStore::new(dir.path().join("inbox.test.sqlite")).unwrap();
    (Arc::new(store), dir)
}

/// Compose, reply, act on and delete a thread against any backend
fn run_full_lifecycle(store: Arc<dyn InboxStore>) {
    let sender = Arc::new(MemoryMailSender::new());
    let composer = Composer::new(store.clone(), sender.clone());
    let replies = ReplySender::new(store.clone(), sender.clone());
    let actions = ActionHandler::new(store.clone());

    // Compose a new conversation
    let outcome = composer.compose(compose_request()).unwrap();
    let thread_id = outcome.thread_id.clone();

    let thread = store.get_thread(&thread_id).unwrap().unwrap();
    assert_eq!(thread.status, ThreadStatus::Sent);
    let messages = store.list_messages_for_thread(&thread_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].direction, Direction::Outbound);

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["client@x.com".to_string()]);
    assert_eq!(sent[0].subject, "Hello");
    assert_eq!(sent[0].body, MailBody::Text("Hi there".to_string()));

    // Client answers; the thread comes back to the inbox unread
    let inbound = InboundMail {
        from: "client@x.com".to_string(),
        subject: "Re: Hello".to_string(),
        body: "Sounds good".to_string(),
        attachments: Vec::new(),
        thread_id: Some(thread_id.clone()),
    };
    assert_eq!(record_inbound(store.as_ref(), inbound).unwrap(), thread_id);
    assert_eq!(folder_counts(store.as_ref()).unwrap().unread, 1);

    // Reply with a signature
    let mailbox = Mailbox::new(MailboxId::new("mb1"), "hello@studio.dev", Some("Studio".to_string()));
    store.upsert_mailbox(mailbox.clone()).unwrap();
    store
        .save_signature(Signature {
            mailbox_id: mailbox.id.clone(),
            html: "<i>Studio</i>".to_string(),
        })
        .unwrap();
    let reply = replies
        .reply(ReplyRequest {
            thread_id: thread_id.clone(),
            body: "Great,\nstarting Monday".to_string(),
            to: "client@x.com".to_string(),
            subject: "Re: Hello".to_string(),
            from: "hello@studio.dev".to_string(),
            attachments: Vec::new(),
        })
        .unwrap();
    assert!(reply.signed);
    assert_eq!(
        sender.sent()[1].body,
        MailBody::Html("Great,<br>starting Monday<br><br>--<br><i>Studio</i>".to_string())
    );

    let detail = get_thread_detail(store.as_ref(), &thread_id).unwrap().unwrap();
    let directions: Vec<_> = detail.messages.iter().map(|m| m.direction).collect();
    assert_eq!(
        directions,
        vec![Direction::Outbound, Direction::Inbound, Direction::Outbound]
    );

    // Folder moves and read state
    assert_eq!(
        actions.apply_named(&thread_id, "markAsRead").unwrap(),
        ActionOutcome::ReadState { unread: false }
    );
    actions.apply(&thread_id, ThreadAction::Archive).unwrap();
    assert_eq!(list_threads(store.as_ref(), ThreadStatus::Archive, 10, 0).unwrap().len(), 1);
    assert!(list_threads(store.as_ref(), ThreadStatus::Inbox, 10, 0).unwrap().is_empty());

    actions.apply(&thread_id, ThreadAction::Trash).unwrap();
    actions.apply(&thread_id, ThreadAction::Restore).unwrap();
    assert_eq!(
        store.get_thread(&thread_id).unwrap().unwrap().status,
        ThreadStatus::Inbox
    );

    // Unknown actions are rejected
    assert!(matches!(
        actions.apply_named(&thread_id, "snooze"),
        Err(InboxError::InvalidAction(_))
    ));

    // Delete is permanent
    actions.apply(&thread_id, ThreadAction::Delete).unwrap();
    assert!(matches!(
        actions.apply(&thread_id, ThreadAction::Archive),
        Err(InboxError::NotFound(_))
    ));
    assert!(get_thread_detail(store.as_ref(), &thread_id).unwrap().is_none());
    assert!(store.list_messages_for_thread(&thread_id).unwrap().is_empty());
}

#[test]
fn test_full_lifecycle_in_memory() {
    run_full_lifecycle(Arc::new(InMemoryInboxStore::new()));
}

#[test]
fn test_full_lifecycle_sqlite() {
    let (store, _dir) = sqlite_store();
    run_full_lifecycle(store);
}

#[test]
fn test_compose_end_to_end_scenario() {
    let store = Arc::new(InMemoryInboxStore::new());
    let sender = Arc::new(MemoryMailSender::new());
    let composer = Composer::new(store.clone(), sender.clone());

    let mut request = compose_request();
    request.from_name = None;
    let outcome = composer.compose(request).unwrap();

    assert_eq!(store.count_threads(ThreadStatus::Sent).unwrap(), 1);
    let messages = store.list_messages_for_thread(&outcome.thread_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].direction, Direction::Outbound);
    assert_eq!(messages[0].body, "Hi there");

    assert_eq!(sender.attempts(), 1);
    assert_eq!(sender.sent()[0].to, vec!["client@x.com".to_string()]);
    assert_eq!(sender.sent()[0].from, "hello <hello@studio.dev>");
}

#[test]
fn test_compose_failure_is_persisted_in_sqlite() {
    let (store, _dir) = sqlite_store();
    let composer = Composer::new(store.clone(), Arc::new(MemoryMailSender::failing("bad key")));

    let err = composer.compose(compose_request()).unwrap_err();
    assert!(matches!(err, InboxError::DispatchFailed(_)));

    let threads = list_threads(store.as_ref(), ThreadStatus::Sent, 10, 0).unwrap();
    assert_eq!(threads.len(), 1);
    assert!(threads[0].send_failed);
}

#[test]
fn test_toggle_read_roundtrip_sqlite() {
    let (store, _dir) = sqlite_store();
    let thread_id = record_inbound(
        store.as_ref(),
        InboundMail {
            from: "Jane <jane@example.com>".to_string(),
            subject: "Brief".to_string(),
            body: "Attached".to_string(),
            attachments: Vec::new(),
            thread_id: None,
        },
    )
    .unwrap();

    let actions = ActionHandler::new(store.clone());
    let before = store.get_thread(&thread_id).unwrap().unwrap();
    actions.apply(&thread_id, ThreadAction::ToggleRead).unwrap();
    actions.apply(&thread_id, ThreadAction::ToggleRead).unwrap();
    let after = store.get_thread(&thread_id).unwrap().unwrap();
    assert_eq!(after.unread, before.unread);
    assert_eq!(after.status, before.status);
}

#[test]
fn test_missing_thread_everywhere() {
    let store = Arc::new(InMemoryInboxStore::new());
    let sender = Arc::new(MemoryMailSender::new());
    let ghost = ThreadId::new("ghost");

    let actions = ActionHandler::new(store.clone());
    assert!(matches!(
        actions.apply_named(&ghost, "trash"),
        Err(InboxError::NotFound(_))
    ));

    let replies = ReplySender::new(store.clone(), sender.clone());
    let err = replies
        .reply(ReplyRequest {
            thread_id: ghost,
            body: "hi".to_string(),
            to: "client@x.com".to_string(),
            subject: "Re".to_string(),
            from: "hello@studio.dev".to_string(),
            attachments: Vec::new(),
        })
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(sender.attempts(), 0);
    assert_eq!(store.write_count(), 0);
}
