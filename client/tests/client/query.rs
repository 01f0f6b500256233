use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use client::{ClientError, QueryOptions, RetryableQuery};
use test_helpers::{ScriptedProducer, init_test_logging, network_error};

fn options(retry_attempts: u32, retry_delay: Duration) -> QueryOptions {
    QueryOptions::once()
        .retry_attempts(retry_attempts)
        .retry_delay(retry_delay)
}

#[tokio::test]
async fn starts_loading_with_no_data() {
    let producer = ScriptedProducer::<Vec<String>>::new([]);
    let query = RetryableQuery::new(QueryOptions::default(), producer.producer());

    let state = query.state();
    assert!(state.loading);
    assert!(state.data.is_none());
    assert!(state.is_initial_loading());
    assert_eq!(producer.invocations(), 0);
}

#[tokio::test]
async fn two_failures_then_success() -> anyhow::Result<()> {
    init_test_logging();
    let producer = ScriptedProducer::new([
        network_error(),
        network_error(),
        Ok(vec!["A".to_string(), "B".to_string()]),
    ]);
    let query =
        RetryableQuery::new(options(2, Duration::ZERO), producer.producer());

    query.retry().await;

    let state = query.state();
    assert_eq!(state.data, Some(vec!["A".to_string(), "B".to_string()]));
    assert_eq!(state.error, None);
    assert!(!state.loading);
    assert_eq!(state.attempt, 2);
    assert_eq!(producer.invocations(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn waits_the_configured_delay_between_attempts() {
    let delay = Duration::from_millis(1000);
    let producer = ScriptedProducer::new([
        network_error(),
        network_error(),
        network_error(),
        Ok(42),
    ]);
    let query = RetryableQuery::new(options(3, delay), producer.producer());

    query.retry().await;

    assert_eq!(query.data(), Some(42));
    let invoked_at = producer.invoked_at();
    assert_eq!(invoked_at.len(), 4);
    for pair in invoked_at.windows(2) {
        assert!(pair[1] - pair[0] >= delay);
    }
}

#[tokio::test]
async fn exhausted_retries_keep_previous_data() {
    let producer = ScriptedProducer::new([
        Ok("old".to_string()),
        network_error(),
        network_error(),
    ]);
    let query =
        RetryableQuery::new(options(1, Duration::ZERO), producer.producer());

    query.retry().await;
    assert_eq!(query.data().as_deref(), Some("old"));

    query.retry().await;
    let state = query.state();
    assert_eq!(state.data.as_deref(), Some("old"));
    assert!(matches!(state.error, Some(ClientError::Store(_))));
    assert!(!state.loading);
    assert!(state.is_stale());
    assert_eq!(producer.invocations(), 3);
}

#[tokio::test]
async fn empty_results_are_data() {
    let producer = ScriptedProducer::new([Ok(Vec::<u32>::new())]);
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());

    query.retry().await;

    assert_eq!(query.data(), Some(vec![]));
    assert_eq!(query.error(), None);
}

#[tokio::test]
async fn retry_sets_loading_before_anything_runs() {
    let producer = ScriptedProducer::new([network_error(), Ok(1)]);
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());

    query.retry().await;
    assert!(query.error().is_some());
    assert!(!query.is_loading());

    let run = query.retry();
    let state = query.state();
    assert!(state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.attempt, 0);

    run.await;
    assert_eq!(query.data(), Some(1));
}

#[tokio::test]
async fn only_the_latest_retry_applies() {
    let producer = ScriptedProducer::new([]);
    let first_gate = producer.gated();
    let second_gate = producer.gated();
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());

    let mut first = query.retry();
    assert!(futures::poll!(&mut first).is_pending());
    let mut second = query.retry();
    assert!(futures::poll!(&mut second).is_pending());
    assert_eq!(producer.invocations(), 2);

    let _ = second_gate.send(Ok("second"));
    second.await;
    let _ = first_gate.send(Ok("first"));
    first.await;

    assert_eq!(query.data(), Some("second"));
    assert!(!query.is_loading());
}

#[tokio::test]
async fn a_superseded_failure_is_ignored() {
    let producer = ScriptedProducer::new([]);
    let first_gate = producer.gated();
    let second_gate = producer.gated();
    let query = RetryableQuery::new(
        options(2, Duration::ZERO),
        producer.producer(),
    );

    let mut first = query.retry();
    assert!(futures::poll!(&mut first).is_pending());
    let mut second = query.retry();
    assert!(futures::poll!(&mut second).is_pending());

    let _ = second_gate.send(Ok("second"));
    second.await;
    let _ = first_gate.send(network_error());
    first.await;

    assert_eq!(query.data(), Some("second"));
    assert_eq!(query.error(), None);
    assert!(!query.is_loading());
    // The stale sequence does not go on to retry.
    assert_eq!(producer.invocations(), 2);
}

#[tokio::test]
async fn disposing_with_an_attempt_in_flight_drops_its_result() {
    let producer = ScriptedProducer::new([]);
    let gate = producer.gated();
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    query.subscribe(move || counter.set(counter.get() + 1));

    let mut run = query.retry();
    assert!(futures::poll!(&mut run).is_pending());
    assert_eq!(producer.invocations(), 1);
    let before = query.state();
    let seen = notified.get();

    query.dispose();
    let _ = gate.send(Ok(3));
    run.await;

    assert_eq!(query.state(), before);
    assert_eq!(query.data(), None);
    assert!(query.is_loading());
    assert_eq!(notified.get(), seen);
}

#[tokio::test]
async fn a_sequence_superseded_before_it_runs_never_calls_the_producer() {
    let producer = ScriptedProducer::new([Ok(1), Ok(2)]);
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());

    let first = query.retry();
    let second = query.retry();
    first.await;
    assert_eq!(producer.invocations(), 0);
    assert!(query.is_loading());

    second.await;
    assert_eq!(query.data(), Some(1));
    assert_eq!(producer.invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_time_out_and_are_retried() {
    let producer = ScriptedProducer::<u8>::new([]);
    let _never = producer.gated();
    let query = RetryableQuery::new(
        options(1, Duration::ZERO)
            .attempt_timeout(Some(Duration::from_secs(15))),
        producer.producer(),
    );

    query.retry().await;

    // The second attempt finds the script empty and fails.
    assert_eq!(producer.invocations(), 2);
    assert!(query.error().is_some());

    let producer = ScriptedProducer::new([]);
    let _never = producer.gated();
    let query = RetryableQuery::<u8>::new(
        QueryOptions::once().attempt_timeout(Some(Duration::from_secs(5))),
        producer.producer(),
    );
    query.retry().await;
    assert_eq!(
        query.error(),
        Some(ClientError::Timeout(Duration::from_secs(5)))
    );
}

#[tokio::test(start_paused = true)]
async fn dispose_cancels_a_pending_retry() {
    let producer = ScriptedProducer::new([network_error(), Ok(7)]);
    let query = RetryableQuery::new(
        options(1, Duration::from_secs(1)),
        producer.producer(),
    );
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    query.subscribe(move || counter.set(counter.get() + 1));

    let mut run = query.retry();
    assert!(futures::poll!(&mut run).is_pending());
    assert_eq!(producer.invocations(), 1);
    let seen = notified.get();

    query.dispose();
    run.await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(query.is_disposed());
    assert_eq!(producer.invocations(), 1);
    assert_eq!(query.data(), None);
    assert_eq!(notified.get(), seen);

    // Disposed queries stay put.
    query.retry().await;
    assert_eq!(producer.invocations(), 1);
}

#[tokio::test]
async fn listeners_hear_each_change() {
    let producer = ScriptedProducer::new([Ok(1), Ok(2)]);
    let query = RetryableQuery::new(QueryOptions::once(), producer.producer());
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    let id = query.subscribe(move || counter.set(counter.get() + 1));

    query.retry().await;
    // loading, then success
    assert_eq!(notified.get(), 2);

    query.unsubscribe(id);
    query.retry().await;
    assert_eq!(notified.get(), 2);
    assert_eq!(query.data(), Some(2));
}
