use std::env;

use anyhow::Context;
use chrono::{DateTime, Utc};

/// Offers may stay open for at most ten years.
pub const MAX_OFFER_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// HS256 secret used to validate bearer tokens.
    pub jwt_secret: Option<String>,
    /// Stand-in caller used when a request carries no Authorization header.
    pub fallback_user_id: Option<i64>,
    pub offer_ttl_hours: i64,
    pub expiry_sweep_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());
        let fallback_user_id = parse_fallback_user(env::var("AUTH_FALLBACK_USER_ID").ok())?;
        let offer_ttl_hours = parse_offer_ttl(env::var("OFFER_TTL_HOURS").ok())?;
        let expiry_sweep_secs = env::var("OFFER_EXPIRY_SWEEP_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(300);

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            fallback_user_id,
            offer_ttl_hours,
            expiry_sweep_secs,
        })
    }

    /// Deadline for an offer opened or countered at `now`; `None` on overflow.
    pub fn offer_deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        chrono::Duration::try_hours(self.offer_ttl_hours).and_then(|ttl| now.checked_add_signed(ttl))
    }
}

fn parse_offer_ttl(raw: Option<String>) -> anyhow::Result<i64> {
    let Some(value) = raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(168);
    };
    let hours = value
        .parse::<i64>()
        .with_context(|| format!("OFFER_TTL_HOURS must be an integer, got {value}"))?;
    anyhow::ensure!(
        (1..=MAX_OFFER_TTL_HOURS).contains(&hours),
        "OFFER_TTL_HOURS must be between 1 and {MAX_OFFER_TTL_HOURS}, got {hours}"
    );
    Ok(hours)
}

/// Unset means user 1; `off` disables the fallback entirely.
fn parse_fallback_user(raw: Option<String>) -> anyhow::Result<Option<i64>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Some(1)),
        Some("off") => Ok(None),
        Some(value) => {
            let id = value
                .parse::<i64>()
                .with_context(|| format!("AUTH_FALLBACK_USER_ID must be an integer or `off`, got {value}"))?;
            Ok(Some(id))
        }
    }
}
