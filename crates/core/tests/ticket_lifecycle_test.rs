//! End-to-end lifecycle walkthroughs against the fully wired engine.

mod common;

use common::{add_queue, world, BRANCH_POINT};
use guiche_core::errors::{Error, TicketError};
use guiche_core::fanout::{TicketEvent, Topic};
use guiche_core::tickets::{TicketLedgerTrait, TicketStatus};

#[tokio::test]
async fn test_daily_limit_walkthrough() {
    let w = world();
    add_queue(&w, "q1", 2, 2);

    // Two issues fill the queue.
    let first = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    assert_eq!(first.ticket_number, 1);
    assert_eq!(first.status, TicketStatus::Pending);
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 1);

    let second = w.ledger.issue("q1", Some("u2".to_string()), 0).await.unwrap();
    assert_eq!(second.ticket_number, 2);
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 2);

    // Third issue bounces off the daily limit.
    assert!(matches!(
        w.ledger.issue("q1", Some("u3".to_string()), 0).await.unwrap_err(),
        Error::Ticket(TicketError::QueueFull { .. })
    ));

    // Call and serve #1.
    let called = w.dispatcher.call_next("q1").await.unwrap().unwrap();
    assert_eq!(called.ticket_number, 1);
    assert_eq!(called.counter, Some(1));
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 1);

    let served = w.presence.validate(&called.id, Some(BRANCH_POINT)).unwrap();
    assert_eq!(served.status, TicketStatus::Served);

    // Round-robin advances to counter 2 for #2.
    let called = w.dispatcher.call_next("q1").await.unwrap().unwrap();
    assert_eq!(called.ticket_number, 2);
    assert_eq!(called.counter, Some(2));

    // A Called ticket can no longer be cancelled by its owner.
    assert!(matches!(
        w.ledger.cancel(&called.id, "u2").unwrap_err(),
        Error::Ticket(TicketError::InvalidState)
    ));

    let stats = w.ledger.queue_stats("q1").unwrap();
    assert_eq!(stats.active_tickets, 0);
    assert_eq!(stats.current_ticket, 2);
}

#[tokio::test]
async fn test_duplicate_pending_per_requester_is_rejected() {
    let w = world();
    add_queue(&w, "q1", 10, 1);

    let ticket = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    assert!(matches!(
        w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap_err(),
        Error::Ticket(TicketError::DuplicateActiveTicket)
    ));

    // After cancelling, the same requester may re-enter the line.
    w.ledger.cancel(&ticket.id, "u1").unwrap();
    let again = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    assert_eq!(again.ticket_number, 2);
}

#[tokio::test]
async fn test_terminal_states_reject_further_transitions() {
    let w = world();
    add_queue(&w, "q1", 10, 1);

    let ticket = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    w.dispatcher.call_next("q1").await.unwrap().unwrap();
    w.presence.validate(&ticket.id, None).unwrap();

    // Served is terminal: no cancel, no second validation.
    assert!(matches!(
        w.ledger.cancel(&ticket.id, "u1").unwrap_err(),
        Error::Ticket(TicketError::InvalidState)
    ));
    assert!(matches!(
        w.presence.validate(&ticket.id, None).unwrap_err(),
        Error::Ticket(TicketError::InvalidState)
    ));
}

#[tokio::test]
async fn test_expired_call_is_swept_exactly_once() {
    let w = world();
    add_queue(&w, "q1", 10, 1);

    let doomed = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    w.ledger.issue("q1", Some("u2".to_string()), 0).await.unwrap();

    // Zero-minute timeout: the call expires immediately.
    w.dispatcher
        .call_next_with_timeout("q1", 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 1);

    let report = w.notifications.proactive_sweep().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(
        w.ledger.get_ticket(&doomed.id).unwrap().status,
        TicketStatus::Cancelled
    );
    // The dispatch already removed the ticket from the pending count;
    // expiry must not drive it negative or double-count.
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 1);

    // Validation after expiry is rejected.
    assert!(matches!(
        w.presence.validate(&doomed.id, None).unwrap_err(),
        Error::Ticket(TicketError::InvalidState)
    ));

    // Idempotent: a second pass finds nothing.
    let report = w.notifications.proactive_sweep().await.unwrap();
    assert_eq!(report.expired, 0);
}

#[tokio::test]
async fn test_trade_flow_end_to_end() {
    let w = world();
    add_queue(&w, "q1", 10, 1);

    let mine = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    let theirs = w.ledger.issue("q1", Some("u2".to_string()), 0).await.unwrap();

    w.trades.offer(&theirs.id, "u2").await.unwrap();
    let (accepted, target) = w.trades.accept(&mine.id, &theirs.id, "u1").unwrap();

    assert_eq!(accepted.user_id.as_deref(), Some("u2"));
    assert_eq!(target.user_id.as_deref(), Some("u1"));
    assert!(!target.trade_available);

    // u1 now holds the earlier slot and is dispatched first.
    let called = w.dispatcher.call_next("q1").await.unwrap().unwrap();
    assert_eq!(called.ticket_number, mine.ticket_number);
    assert_eq!(called.user_id.as_deref(), Some("u2"));
}

#[tokio::test]
async fn test_queue_topic_sees_mutations_in_commit_order() {
    let w = world();
    add_queue(&w, "q1", 10, 1);
    let mut rx = w.bus.subscribe(Topic::Queue("q1".to_string()));

    let first = w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    w.ledger.issue("q1", Some("u2".to_string()), 0).await.unwrap();
    w.dispatcher.call_next("q1").await.unwrap().unwrap();
    w.presence.validate(&first.id, None).unwrap();

    assert!(matches!(
        rx.recv().await.unwrap(),
        TicketEvent::Issued { ticket_number: 1, .. }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        TicketEvent::Issued { ticket_number: 2, .. }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        TicketEvent::Called { ticket_number: 1, counter: 1, .. }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        TicketEvent::Served { ticket_number: 1, .. }
    ));
}

#[tokio::test]
async fn test_institution_topic_aggregates_branch_queues() {
    let w = world();
    add_queue(&w, "q1", 10, 1);
    add_queue(&w, "q2", 10, 1);
    let mut rx = w.bus.subscribe(Topic::Institution("i1".to_string()));

    w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    w.ledger.issue("q2", Some("u1".to_string()), 0).await.unwrap();

    let seen: Vec<String> = vec![
        rx.recv().await.unwrap().queue_id().to_string(),
        rx.recv().await.unwrap().queue_id().to_string(),
    ];
    assert_eq!(seen, vec!["q1".to_string(), "q2".to_string()]);
}

#[tokio::test]
async fn test_called_owner_gets_notified() {
    let w = world();
    add_queue(&w, "q1", 10, 1);

    w.ledger.issue("q1", Some("u1".to_string()), 0).await.unwrap();
    w.dispatcher.call_next("q1").await.unwrap().unwrap();

    let sent = w.gateway.sent_to("u1");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("A001"));
}
