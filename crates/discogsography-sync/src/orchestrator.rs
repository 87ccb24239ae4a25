//! `run_full_sync` orchestration (spec §4.D.3) and the trigger-point
//! concurrency controls the HTTP `POST /api/sync` handler calls into
//! before spawning a sync task (spec §4.D.4).

use std::collections::HashMap;
use std::sync::Arc;

use deadpool_redis::redis::AsyncCommands;
use discogsography_core::error::{AppError, Result};
use discogsography_db::GraphStore;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::client::{DiscogsClient, DiscogsCredentials};
use crate::crypto::TokenCipher;
use crate::pagination;

/// Tracks in-flight sync tasks so a second trigger for the same user is
/// recognized as "already running" rather than spawning a duplicate.
#[derive(Clone)]
pub struct SyncTrigger {
    pool: PgPool,
    graph: GraphStore,
    redis: deadpool_redis::Pool,
    cipher: Arc<TokenCipher>,
    discogs_user_agent: String,
    cooldown_seconds: u64,
    running: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

pub struct TriggerResult {
    pub sync_id: Uuid,
    pub already_running: bool,
}

impl SyncTrigger {
    pub fn new(
        pool: PgPool,
        graph: GraphStore,
        redis: deadpool_redis::Pool,
        cipher: TokenCipher,
        discogs_user_agent: String,
        cooldown_seconds: u64,
    ) -> Self {
        Self {
            pool,
            graph,
            redis,
            cipher: Arc::new(cipher),
            discogs_user_agent,
            cooldown_seconds,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Implements spec §4.D.4's three-step check in order: cooldown, then
    /// in-process running-task map, then the new `sync_history` row.
    pub async fn trigger(&self, user_id: Uuid) -> Result<TriggerResult> {
        let cooldown_key = format!("sync:cooldown:{user_id}");
        let mut redis = self
            .redis
            .get()
            .await
            .map_err(|_| AppError::RedisConnectionFailed)?;

        let on_cooldown: bool = redis
            .exists(&cooldown_key)
            .await
            .map_err(|e| AppError::RedisOperationFailed(e.to_string()))?;
        if on_cooldown {
            return Err(AppError::SyncCooldown {
                retry_after: self.cooldown_seconds,
            });
        }

        let mut running = self.running.lock().await;
        running.retain(|_, handle| !handle.is_finished());
        if let Some(_existing) = running.get(&user_id) {
            let sync_id: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM sync_history WHERE user_id = $1 AND status = 'running' \
                 ORDER BY started_at DESC LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

            return Ok(TriggerResult {
                sync_id: sync_id.unwrap_or(user_id),
                already_running: true,
            });
        }

        let sync_id: Uuid = sqlx::query_scalar(
            "INSERT INTO sync_history (user_id, sync_type, status) VALUES ($1, 'full', 'running') RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        let _: () = redis
            .set_ex(&cooldown_key, "1", self.cooldown_seconds)
            .await
            .map_err(|e| AppError::RedisOperationFailed(e.to_string()))?;

        let this = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = run_full_sync(&this, user_id, sync_id).await {
                tracing::error!(error = %err, %user_id, %sync_id, "sync task ended with an unrecoverable error");
            }
        });
        running.insert(user_id, handle);

        Ok(TriggerResult {
            sync_id,
            already_running: false,
        })
    }
}

/// Runs a full collection + wantlist sync for one user, updating the
/// `sync_history` row with the final outcome regardless of success.
pub async fn run_full_sync(trigger: &SyncTrigger, user_uuid: Uuid, sync_id: Uuid) -> Result<()> {
    let outcome = do_sync(trigger, user_uuid).await;

    let (status, items_synced, error_message) = match &outcome {
        Ok(total) => ("completed", *total as i32, None),
        Err(err) => ("failed", 0, Some(err.to_string())),
    };

    sqlx::query(
        "UPDATE sync_history SET status = $1, items_synced = $2, error_message = $3, completed_at = now() \
         WHERE id = $4",
    )
    .bind(status)
    .bind(items_synced)
    .bind(error_message)
    .bind(sync_id)
    .execute(&trigger.pool)
    .await
    .map_err(AppError::from)?;

    outcome.map(|_| ())
}

async fn do_sync(trigger: &SyncTrigger, user_uuid: Uuid) -> Result<u64> {
    let row: Option<(Vec<u8>, Vec<u8>, Vec<u8>, String)> = sqlx::query_as(
        "SELECT access_token_encrypted, access_secret_encrypted, nonce, provider_username \
         FROM oauth_tokens WHERE user_id = $1 AND provider = 'discogs'",
    )
    .bind(user_uuid)
    .fetch_optional(&trigger.pool)
    .await
    .map_err(AppError::from)?;

    let Some((token_ct, secret_ct, nonce, username)) = row else {
        return Err(AppError::DiscogsNotConnected);
    };

    let access_token = trigger.cipher.decrypt(&token_ct, &nonce)?;
    let access_token_secret = trigger.cipher.decrypt(&secret_ct, &nonce)?;

    let config_rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT key, value FROM app_config WHERE key IN ('discogs_consumer_key', 'discogs_consumer_secret')",
    )
    .fetch_all(&trigger.pool)
    .await
    .map_err(AppError::from)?;
    let config: HashMap<String, String> = config_rows.into_iter().collect();

    let consumer_key = config
        .get("discogs_consumer_key")
        .ok_or_else(|| AppError::ConfigurationError {
            message: "discogs_consumer_key not set in app_config".into(),
        })?
        .clone();
    let consumer_secret = config
        .get("discogs_consumer_secret")
        .ok_or_else(|| AppError::ConfigurationError {
            message: "discogs_consumer_secret not set in app_config".into(),
        })?
        .clone();

    let client = DiscogsClient::new(
        DiscogsCredentials {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        },
        trigger.discogs_user_agent.clone(),
    )
    .map_err(|e| AppError::ConfigurationError { message: e.to_string() })?;

    let collection_count = pagination::sync_collection(&client, &username, user_uuid, &trigger.pool, &trigger.graph).await?;
    let wantlist_count = pagination::sync_wantlist(&client, &username, user_uuid, &trigger.pool, &trigger.graph).await?;

    Ok(collection_count + wantlist_count)
}
