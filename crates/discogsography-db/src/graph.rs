//! Graph store driver: a single long-lived `kuzu` connection owned by a
//! dedicated thread, since the embedded database handle is not `Send`.
//!
//! Callers submit Cypher through an mpsc channel and await the reply on a
//! oneshot; this keeps the actual `kuzu::Connection` pinned to one OS thread
//! for its whole lifetime while still giving async callers a normal
//! `async fn query(...)` to call.

use std::path::Path;
use std::thread::JoinHandle;

use discogsography_core::error::{AppError, Result};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::recovery::{retry_with_backoff, RetryConfig};

enum GraphCommand {
    Execute {
        cypher: String,
        reply: oneshot::Sender<std::result::Result<(), String>>,
    },
    Query {
        cypher: String,
        reply: oneshot::Sender<std::result::Result<Vec<Value>, String>>,
    },
    Shutdown,
}

/// Handle to the graph store. Cheap to clone; every clone shares the same
/// background connection thread.
#[derive(Clone)]
pub struct GraphStore {
    sender: mpsc::Sender<GraphCommand>,
}

impl GraphStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<(Self, GraphStoreHandle)> {
        let path = path.as_ref().to_path_buf();
        let (tx, mut rx) = mpsc::channel::<GraphCommand>(64);

        let join_handle = std::thread::Builder::new()
            .name("graph-store".to_string())
            .spawn(move || {
                let db = match kuzu::Database::new(&path, kuzu::SystemConfig::default()) {
                    Ok(db) => db,
                    Err(err) => {
                        error!(error = %err, "failed to open graph database");
                        return;
                    }
                };
                let mut conn = match kuzu::Connection::new(&db) {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!(error = %err, "failed to open graph connection");
                        return;
                    }
                };

                while let Some(command) = rx.blocking_recv() {
                    match command {
                        GraphCommand::Execute { cypher, reply } => {
                            let result = conn.query(&cypher).map(|_| ()).map_err(|e| e.to_string());
                            let _ = reply.send(result);
                        }
                        GraphCommand::Query { cypher, reply } => {
                            let result = conn
                                .query(&cypher)
                                .map(query_result_to_json)
                                .map_err(|e| e.to_string());
                            let _ = reply.send(result);
                        }
                        GraphCommand::Shutdown => break,
                    }
                }
                info!("graph store connection thread stopped");
            })?;

        Ok((
            GraphStore { sender: tx },
            GraphStoreHandle {
                join_handle: Some(join_handle),
            },
        ))
    }

    /// Run a write statement (typically a `MERGE`). Transient failures
    /// (lock contention, temporary I/O errors) are retried with backoff;
    /// anything else is reported as fatal and not retried.
    pub async fn execute(&self, cypher: impl Into<String>) -> Result<()> {
        let cypher = cypher.into();
        let sender = self.sender.clone();
        retry_with_backoff(
            || {
                let cypher = cypher.clone();
                let sender = sender.clone();
                async move { send_execute(&sender, cypher).await }
            },
            RetryConfig::default(),
            "graph_execute",
        )
        .await
    }

    /// Run a read query and return each result row as a JSON object.
    pub async fn query(&self, cypher: impl Into<String>) -> Result<Vec<Value>> {
        let cypher = cypher.into();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(GraphCommand::Query {
                cypher,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::GraphFatal("graph store thread is gone".into()))?;

        match reply_rx.await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(message)) => Err(classify_graph_error(message)),
            Err(_) => Err(AppError::GraphFatal("graph store reply dropped".into())),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        self.execute("RETURN 1").await
    }

    /// Ask the background connection thread to stop. Combine with
    /// [`GraphStoreHandle`]'s `Drop` to join it during graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(GraphCommand::Shutdown).await;
    }
}

async fn send_execute(sender: &mpsc::Sender<GraphCommand>, cypher: String) -> Result<()> {
    let (reply_tx, reply_rx) = oneshot::channel();
    sender
        .send(GraphCommand::Execute {
            cypher,
            reply: reply_tx,
        })
        .await
        .map_err(|_| AppError::GraphFatal("graph store thread is gone".into()))?;

    match reply_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(message)) => Err(classify_graph_error(message)),
        Err(_) => Err(AppError::GraphFatal("graph store reply dropped".into())),
    }
}

/// Lock contention and I/O timeouts are transient; parse errors and schema
/// mismatches are not and should not be retried.
fn classify_graph_error(message: String) -> AppError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("lock") || lowered.contains("timeout") || lowered.contains("busy") {
        AppError::GraphTransient(message)
    } else {
        AppError::GraphFatal(message)
    }
}

/// Convert each result row into a JSON object keyed by column name, the
/// shape handlers and sink code deserialize into their own row structs.
fn query_result_to_json(result: kuzu::QueryResult) -> Vec<Value> {
    let columns = result.get_column_names();
    result
        .into_iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for (name, value) in columns.iter().zip(row.into_iter()) {
                object.insert(name.clone(), kuzu_value_to_json(value));
            }
            Value::Object(object)
        })
        .collect()
}

fn kuzu_value_to_json(value: kuzu::Value) -> Value {
    match value {
        kuzu::Value::Null(_) => Value::Null,
        kuzu::Value::Bool(b) => Value::Bool(b),
        kuzu::Value::Int64(n) => Value::from(n),
        kuzu::Value::Int32(n) => Value::from(n),
        kuzu::Value::Double(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        kuzu::Value::String(s) => Value::String(s),
        other => Value::String(format!("{other:?}")),
    }
}

/// Keeps the background connection thread alive; dropping it signals
/// shutdown and joins the thread.
pub struct GraphStoreHandle {
    join_handle: Option<JoinHandle<()>>,
}

impl Drop for GraphStoreHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!("graph store connection thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_lock_contention_as_transient() {
        let err = classify_graph_error("Runtime exception: resource busy".into());
        assert!(matches!(err, AppError::GraphTransient(_)));
    }

    #[test]
    fn classifies_parse_error_as_fatal() {
        let err = classify_graph_error("Parser exception: invalid syntax".into());
        assert!(matches!(err, AppError::GraphFatal(_)));
    }
}
