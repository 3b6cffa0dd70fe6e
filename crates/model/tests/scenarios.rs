//! End-to-end scenarios for the simulation engine.
//!
//! These exercise whole models built from configuration: rendezvous and
//! horizon accounting for a single stage, pacing of a pure source, and
//! fair batch claiming between replicas contending for one pool.

use flowsim_model::{Model, ModelConfig, SimTime};
use std::time::Duration;
use tokio::time::timeout;

fn model(raw: &str) -> Model {
    let config: ModelConfig = toml::from_str(raw).expect("scenario config must parse");
    Model::from_config(&config).expect("scenario config must resolve")
}

/// Single process, duration 2s, 5 tokens in, 2 tokens out, horizon 10s:
/// feeding 5 tokens yields exactly one batch, stamped a full duration after
/// the feed, with nothing left in flight.
#[tokio::test]
async fn test_single_stage_rendezvous_and_horizon() {
    let model = model(
        r#"
        [processes.stage]
        duration = "2s"
        [processes.stage.in]
        feed = 5
        [processes.stage.out]
        done = 2
        "#,
    );

    let feed = model.pool("feed").unwrap();
    for _ in 0..5 {
        feed.push(SimTime::ZERO).await;
    }

    // The second rendezvous can never complete, so the run is cancelled at
    // the wall budget; the report must reflect the one real batch.
    let report = model
        .run_for(SimTime::from_secs(10), Duration::from_millis(300))
        .await;

    let stage = report.process("stage").unwrap();
    assert_eq!(stage.completed, 1, "five tokens support exactly one batch");
    assert_eq!(stage.in_flight, 0, "a blocked rendezvous is not in flight");
    assert_eq!(report.pool("feed").unwrap().depth, 0);
    assert_eq!(report.pool("done").unwrap().depth, 2);

    // Both outputs carry the batch finish time: one duration after the feed.
    let done = model.pool("done").unwrap();
    for _ in 0..2 {
        let stamp = timeout(Duration::from_secs(1), done.pop())
            .await
            .expect("output token missing");
        assert!(
            stamp >= SimTime::from_secs(2),
            "output appeared before the full processing duration"
        );
    }
}

/// Pure producer, duration 2s, 2 tokens out, horizon 10s: five batches
/// complete (finishing at 2,4,6,8,10s); the batch that would finish at 12s
/// is excluded.
#[tokio::test]
async fn test_pure_producer_horizon_exclusivity() {
    let model = model(
        r#"
        [processes.source]
        duration = "2s"
        [processes.source.out]
        out = 2
        "#,
    );

    let report = model
        .run_for(SimTime::from_secs(10), Duration::from_secs(5))
        .await;

    let source = report.process("source").unwrap();
    assert_eq!(source.completed, 5);
    assert_eq!(
        source.idle_time,
        SimTime::ZERO,
        "a source never waits on inputs"
    );
    assert_eq!(report.pool("out").unwrap().depth, 10);

    // First batch is stamped t0+duration, the last within-horizon batch at
    // the horizon itself.
    let out = model.pool("out").unwrap();
    assert_eq!(out.pop().await, SimTime::from_secs(2));
    let mut last = SimTime::ZERO;
    for _ in 0..9 {
        last = out.pop().await;
    }
    assert_eq!(last, SimTime::from_secs(10));
}

/// Two replicas of one process share an input pool. Feeding exactly one
/// replica's requirement unblocks exactly one replica; total completed
/// batches always equal the batches the combined supply supports.
#[tokio::test]
async fn test_replicas_share_supply_without_splitting_batches() {
    let model = model(
        r#"
        [processes.stage]
        duration = "1s"
        replicas = 2
        [processes.stage.in]
        work = 3
        [processes.stage.out]
        done = 1
        "#,
    );

    let work = model.pool("work").unwrap();
    let handle = model.start(SimTime::from_secs(3600));

    // One replica's worth of tokens: exactly one batch may happen.
    for _ in 0..3 {
        work.push(SimTime::ZERO).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = model.report();
    assert_eq!(
        report.process("stage").unwrap().completed,
        1,
        "one requirement must unblock exactly one replica"
    );

    // Nine more tokens: three more batches, split between the replicas
    // without any half-claimed remainders.
    for _ in 0..9 {
        work.push(SimTime::ZERO).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = model.report();
    assert_eq!(report.process("stage").unwrap().completed, 4);
    assert_eq!(report.pool("work").unwrap().depth, 0);

    handle.cancel();
    handle.join().await;
}

/// A consumer fed through a deliberately tiny intermediate pool: the
/// producer is throttled by backpressure, yet no token is ever lost and
/// downstream accounting stays exact.
#[tokio::test]
async fn test_backpressure_preserves_every_token() {
    let model = model(
        r#"
        [pools]
        narrow = 2

        [processes.source]
        duration = "1s"
        [processes.source.out]
        narrow = 1

        [processes.sink]
        duration = "1s"
        [processes.sink.in]
        narrow = 2
        [processes.sink.out]
        done = 1
        "#,
    );

    let report = model
        .run_for(SimTime::from_secs(20), Duration::from_secs(5))
        .await;

    let produced = report.process("source").unwrap().completed;
    let sink = report.process("sink").unwrap();
    let leftover = report.pool("narrow").unwrap().depth;
    assert!(produced >= 2, "source should make progress through the pool");
    // A batch discarded at the horizon stays in flight but still consumed
    // its tokens, so conservation counts it.
    assert_eq!(
        produced,
        (sink.completed + sink.in_flight) * 2 + leftover as u64,
        "every produced token is either consumed or still enqueued"
    );
    assert!(leftover <= 2, "narrow pool must never exceed its capacity");
}
