//! The per-message protocol shared by the Graph Sink and Table Sink:
//! decode → hash-compare → write → change-hook → ack, with redelivery
//! tracking that shunts poison messages to a dead-letter queue (spec §4.B,
//! §4.C, §7).

use async_trait::async_trait;
use chrono::Utc;
use discogsography_core::error::AppError;
use discogsography_core::hash::content_hash;
use discogsography_core::models::{ChangeMessage, ChangeType, EntityKind};
use futures::StreamExt;
use lapin::message::Delivery;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::bus::{self, Bus, MAX_REDELIVERIES};

/// Per-store write target. The Graph Sink and Table Sink each provide one
/// implementation; this trait is the only thing the shared loop needs from
/// either store.
#[async_trait]
pub trait SinkStore: Send + Sync {
    async fn existing_hash(&self, kind: EntityKind, discogs_id: i64) -> discogsography_core::error::Result<Option<String>>;
    async fn write(
        &self,
        kind: EntityKind,
        discogs_id: i64,
        hash: &str,
        payload: &Value,
    ) -> discogsography_core::error::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SinkCounters {
    pub processed: u64,
    pub skipped_unchanged: u64,
    pub skipped_data_error: u64,
    pub dead_lettered: u64,
}

/// Run the consume loop for one catalog `kind` until the bus connection
/// closes. `sink_name` distinguishes the graph sink's queues from the table
/// sink's (`discogsography-{sink_name}-{type}`).
pub async fn run(
    bus: &Bus,
    sink_name: &str,
    kind: EntityKind,
    store: &(dyn SinkStore),
    counters: &mut SinkCounters,
) -> discogsography_core::error::Result<()> {
    let mut consumer = bus.consume(sink_name, kind).await?;

    while let Some(delivery_result) = consumer.next().await {
        let delivery = match delivery_result {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(error = %err, "bus delivery error, will reconnect");
                return Err(AppError::BusTransient(err.to_string()));
            }
        };

        process_one(bus, sink_name, kind, store, &delivery, counters).await;
    }

    Ok(())
}

async fn process_one(
    bus: &Bus,
    sink_name: &str,
    kind: EntityKind,
    store: &(dyn SinkStore),
    delivery: &Delivery,
    counters: &mut SinkCounters,
) {
    let routing_key = delivery.routing_key.to_string();

    let payload: Value = match serde_json::from_slice(&delivery.data) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, routing_key = %routing_key, "malformed payload, acking without processing");
            counters.skipped_data_error += 1;
            let _ = bus::ack(delivery).await;
            return;
        }
    };

    let Some(discogs_id) = payload.get("id").and_then(Value::as_i64) else {
        warn!(routing_key = %routing_key, "message missing id field, acking without processing");
        counters.skipped_data_error += 1;
        let _ = bus::ack(delivery).await;
        return;
    };

    let hash = content_hash(&payload);

    let outcome = apply(store, kind, discogs_id, &hash, &payload).await;

    match outcome {
        Ok(true) => {
            counters.processed += 1;
            if let Ok(change) = serde_json::to_vec(&ChangeMessage {
                data_type: kind,
                record_id: discogs_id.to_string(),
                change_type: ChangeType::Updated,
                processing_run_id: routing_key.clone(),
                timestamp: Utc::now(),
            }) {
                if let Err(err) = bus.publish_change(kind, &change).await {
                    debug!(error = %err, "change hook publish failed, continuing");
                }
            }
            let _ = bus::ack(delivery).await;
        }
        Ok(false) => {
            counters.skipped_unchanged += 1;
            let _ = bus::ack(delivery).await;
        }
        Err(err) if err.is_transient() => {
            debug!(error = %err, "transient sink error");
            handle_transient_failure(bus, sink_name, kind, delivery, &routing_key, counters).await;
        }
        Err(err) => {
            error!(error = %err, routing_key = %routing_key, "fatal sink error, acking to avoid poisoning the queue");
            counters.skipped_data_error += 1;
            let _ = bus::ack(delivery).await;
        }
    }
}

/// Hash-compare-then-write. Returns `Ok(true)` if a write happened,
/// `Ok(false)` if the record was unchanged and the write was skipped.
async fn apply(
    store: &(dyn SinkStore),
    kind: EntityKind,
    discogs_id: i64,
    hash: &str,
    payload: &Value,
) -> discogsography_core::error::Result<bool> {
    if let Some(existing) = store.existing_hash(kind, discogs_id).await? {
        if existing == hash {
            return Ok(false);
        }
    }
    store.write(kind, discogs_id, hash, payload).await?;
    Ok(true)
}

async fn handle_transient_failure(
    bus: &Bus,
    sink_name: &str,
    kind: EntityKind,
    delivery: &Delivery,
    routing_key: &str,
    counters: &mut SinkCounters,
) {
    let retry_count = bus::retry_count_from_headers(&delivery.properties) + 1;

    if retry_count > MAX_REDELIVERIES {
        if let Err(err) = bus.dead_letter(sink_name, kind, &delivery.data).await {
            error!(error = %err, "failed to dead-letter poison message");
        }
        counters.dead_lettered += 1;
        let _ = bus::ack(delivery).await;
        return;
    }

    if let Err(err) = bus
        .requeue_with_retry_count(routing_key, &delivery.data, retry_count)
        .await
    {
        error!(error = %err, "failed to requeue message, nacking with broker requeue instead");
        let _ = bus::nack_requeue(delivery).await;
        return;
    }

    info!(routing_key, retry_count, "requeued after transient failure");
    let _ = bus::ack(delivery).await;
}
