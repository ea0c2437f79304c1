//! Redis streak counter.
//!
//! Increment, TTL refresh, threshold test and reset run as one Lua script, so
//! two checks for the same driver can never both observe the crossing.

use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use fw_integrity::{StreakTick, ViolationCounter};
use fw_schemas::EngineError;
use redis::{AsyncCommands, Script};

const RECORD_VIOLATION_LUA: &str = r#"
local n = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], tonumber(ARGV[1]))
if n >= tonumber(ARGV[2]) then
  redis.call('DEL', KEYS[1])
  return {n, 1}
end
return {n, 0}
"#;

pub struct RedisViolationCounter {
    pool: Pool,
    script: Script,
}

impl RedisViolationCounter {
    pub fn new(redis_url: &str) -> Result<Self> {
        let pool = RedisConfig::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .context("failed to create redis pool")?;
        Ok(Self {
            pool,
            script: Script::new(RECORD_VIOLATION_LUA),
        })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, EngineError> {
        self.pool
            .get()
            .await
            .map_err(|e| EngineError::infra("redis pool", e))
    }
}

#[async_trait::async_trait]
impl ViolationCounter for RedisViolationCounter {
    async fn record_violation(
        &self,
        key: &str,
        ttl: Duration,
        threshold: u64,
    ) -> Result<StreakTick, EngineError> {
        let mut conn = self.conn().await?;
        let (count, crossed): (u64, u8) = self
            .script
            .key(key)
            .arg(ttl.as_secs().max(1))
            .arg(threshold)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| EngineError::infra("redis record_violation", e))?;
        Ok(StreakTick {
            count,
            crossed: crossed == 1,
        })
    }

    async fn count(&self, key: &str) -> Result<u64, EngineError> {
        let mut conn = self.conn().await?;
        let n: Option<u64> = conn
            .get(key)
            .await
            .map_err(|e| EngineError::infra("redis get", e))?;
        Ok(n.unwrap_or(0))
    }

    async fn clear(&self, key: &str) -> Result<(), EngineError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| EngineError::infra("redis del", e))?;
        Ok(())
    }
}
