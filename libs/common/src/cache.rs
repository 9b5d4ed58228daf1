//! Redis access for HoneyBEE
//!
//! Redis holds the per-client employee sessions. This module only deals in
//! namespaced string keys and values; the session layout lives in the auth crate.

use anyhow::{Result, bail};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use std::env;
use tracing::{debug, info};

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_KEY_PREFIX: &str = "honeybee";

/// Configuration for the Redis connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// `redis://` or `rediss://` URL
    pub url: String,
    /// Namespace prepended to every key, empty for none
    pub key_prefix: String,
}

impl RedisConfig {
    /// Read `REDIS_URL` and `REDIS_KEY_PREFIX`
    pub fn from_env() -> Result<Self> {
        let url = env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            bail!("REDIS_URL must use the redis:// or rediss:// scheme");
        }

        Ok(Self {
            url,
            key_prefix: env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
        })
    }
}

/// Cheap-to-clone handle on a Redis server, scoped to one key namespace
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    /// Build the client. No connection is made until the first command.
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client ready (namespace {:?})", config.key_prefix);

        Ok(Self {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        match self.key_prefix.as_str() {
            "" => key.to_string(),
            prefix => format!("{}:{}", prefix, key),
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Store `value` under `key`, expiring after `ttl_seconds` if given
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let key = self.namespaced(key);
        let mut conn = self.connection().await?;
        debug!("SET {} (ttl {:?})", key, ttl_seconds);

        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, value, ttl).await?,
            None => conn.set::<_, _, ()>(&key, value).await?,
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.get(self.namespaced(key)).await?)
    }

    /// Remove `key`. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = self.namespaced(key);
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(&key).await?;
        debug!("DEL {} removed {}", key, removed);
        Ok(())
    }

    /// True when the server answers PING
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(reply == "PONG")
    }
}
