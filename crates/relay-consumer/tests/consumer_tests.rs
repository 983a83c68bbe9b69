//! Consumer integration tests against real PostgreSQL and RabbitMQ containers
//!
//! ```bash
//! cargo test -p relay-consumer --test consumer_tests -- --ignored --nocapture
//! ```

mod common;

use common::{init_test_tracing, TestPostgres, TestRabbitMq, TEST_QUEUE};
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions},
    types::FieldTable,
    BasicProperties,
};
use relay_common::broker::BrokerSession;
use relay_common::record::{EmployeeRecord, CONTENT_TYPE_JSON};
use relay_consumer::config::StoreFailurePolicy;
use relay_consumer::store::{PgRecordStore, RecordStore};
use relay_consumer::{consume, StopReason, StopSignal};
use std::time::Duration;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_schema_setup_is_idempotent() {
    init_test_tracing();

    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgRecordStore::connect(&pg.store_config())
        .await
        .expect("Failed to connect");

    store.ensure_schema().await.expect("First schema run failed");
    store.ensure_schema().await.expect("Second schema run failed");

    let id = store
        .insert(&EmployeeRecord::new("Alice", Some(30), Some("NYC".into())))
        .await
        .expect("Insert failed");

    let rows = store.rows().await.expect("Select failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(i64::from(rows[0].id), id);
    assert_eq!(rows[0].name, "Alice");
    assert_eq!(rows[0].age, Some(30));
    assert_eq!(rows[0].location.as_deref(), Some("NYC"));

    store.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_absent_optionals_are_stored_as_null() {
    init_test_tracing();

    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let store = PgRecordStore::connect(&pg.store_config())
        .await
        .expect("Failed to connect");
    store.ensure_schema().await.expect("Schema failed");

    store
        .insert(&EmployeeRecord::new("Bob", None, None))
        .await
        .expect("Insert failed");

    let rows = store.rows().await.expect("Select failed");
    assert_eq!(rows[0].age, None);
    assert_eq!(rows[0].location, None);

    store.close().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_queued_messages_are_stored_and_invalid_ones_dropped() {
    init_test_tracing();

    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let rabbit = TestRabbitMq::start().await.expect("Failed to start RabbitMQ");

    let store = PgRecordStore::connect(&pg.store_config())
        .await
        .expect("Failed to connect to store");
    store.ensure_schema().await.expect("Schema failed");

    let session = BrokerSession::open(&rabbit.broker_config())
        .await
        .expect("Failed to connect to broker");
    session.declare_queue(TEST_QUEUE).await.expect("Declare failed");
    session.set_prefetch(1).await.expect("Qos failed");

    for payload in [
        r#"{"age":25}"#,
        r#"{"name":"Alice","age":30,"location":"NYC"}"#,
    ] {
        session
            .channel()
            .basic_publish(
                "",
                TEST_QUEUE,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into()),
            )
            .await
            .expect("Publish failed")
            .await
            .expect("Publish confirm failed");
    }

    let deliveries = session
        .channel()
        .basic_consume(
            TEST_QUEUE,
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .expect("Consume failed");

    let watcher = PgRecordStore::connect(&pg.store_config())
        .await
        .expect("Failed to open watcher connection");
    let stop = async move {
        for _ in 0..300 {
            if watcher.rows().await.map(|r| !r.is_empty()).unwrap_or(false) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        StopSignal::Interrupt
    };

    let report = consume(deliveries, &store, StoreFailurePolicy::Ack, stop)
        .await
        .expect("Consume loop failed");

    assert_eq!(report.reason, StopReason::Interrupted);
    assert_eq!(report.stats.discarded, 1);
    assert_eq!(report.stats.stored, 1);

    let rows = store.rows().await.expect("Select failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Alice");

    let remaining = session
        .channel()
        .queue_declare(
            TEST_QUEUE,
            lapin::options::QueueDeclareOptions {
                durable: true,
                passive: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .expect("Passive declare failed");
    assert_eq!(remaining.message_count(), 0);

    session.close().await.expect("Broker close failed");
    store.close().await;
}
