//! Concurrency properties of the per-queue critical sections.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{add_queue, world};
use guiche_core::errors::{Error, TicketError};
use guiche_core::tickets::TicketLedgerTrait;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_issues_never_duplicate_numbers() {
    let w = Arc::new(world());
    add_queue(&w, "q1", 200, 3);

    let mut handles = Vec::new();
    for task in 0..8 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            let mut numbers = Vec::new();
            for i in 0..25 {
                let user = format!("u{task}-{i}");
                let ticket = w.ledger.issue("q1", Some(user), 0).await.unwrap();
                numbers.push(ticket.ticket_number);
            }
            numbers
        }));
    }

    let mut all_numbers = Vec::new();
    for handle in handles {
        all_numbers.extend(handle.await.unwrap());
    }

    let unique: HashSet<u32> = all_numbers.iter().copied().collect();
    assert_eq!(unique.len(), 200, "every ticket number must be unique");
    assert_eq!(*unique.iter().max().unwrap(), 200);
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_issues_respect_daily_limit() {
    let w = Arc::new(world());
    add_queue(&w, "q1", 10, 1);

    let mut handles = Vec::new();
    for task in 0..40 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            w.ledger
                .issue("q1", Some(format!("u{task}")), 0)
                .await
        }));
    }

    let mut issued = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(Error::Ticket(TicketError::QueueFull { .. })) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(issued, 10);
    assert_eq!(rejected, 30);

    let stats = w.ledger.queue_stats("q1").unwrap();
    assert_eq!(stats.active_tickets, 10);
    assert_eq!(stats.last_number, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_calls_never_dispatch_the_same_ticket() {
    let w = Arc::new(world());
    add_queue(&w, "q1", 50, 4);

    for i in 0..20 {
        w.ledger
            .issue("q1", Some(format!("u{i}")), 0)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            let mut called = Vec::new();
            for _ in 0..5 {
                if let Some(ticket) = w.dispatcher.call_next("q1").await.unwrap() {
                    called.push(ticket);
                }
            }
            called
        }));
    }

    let mut tickets = Vec::new();
    for handle in handles {
        tickets.extend(handle.await.unwrap());
    }

    let ids: HashSet<String> = tickets.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids.len(), 20, "no ticket may be dispatched twice");
    for ticket in &tickets {
        let counter = ticket.counter.unwrap();
        assert!((1..=4).contains(&counter), "counter {counter} out of range");
    }
    assert_eq!(w.ledger.queue_stats("q1").unwrap().active_tickets, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_queues_do_not_interfere() {
    let w = Arc::new(world());
    add_queue(&w, "q1", 100, 1);
    add_queue(&w, "q2", 100, 1);

    let mut handles = Vec::new();
    for queue_id in ["q1", "q2"] {
        let w = w.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..30 {
                w.ledger
                    .issue(queue_id, Some(format!("{queue_id}-u{i}")), 0)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for queue_id in ["q1", "q2"] {
        let stats = w.ledger.queue_stats(queue_id).unwrap();
        assert_eq!(stats.last_number, 30);
        assert_eq!(stats.active_tickets, 30);
    }
}
