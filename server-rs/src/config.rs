use std::env;

use booking_engine::{EngineConfig, RateCard, SlotGrid};
use chrono::NaiveTime;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub rate_limit: RateLimitConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base URL of the Booking Store API. Empty runs against an in-process store.
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    pub submit_max: u32,
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like `env_or_parse`, but a zero value also falls back to the default.
fn env_or_positive(key: &str, default: u32) -> u32 {
    match env_or_parse(key, default) {
        0 => default,
        v => v,
    }
}

fn env_or_time(key: &str, default: NaiveTime) -> NaiveTime {
    env::var(key)
        .ok()
        .and_then(|v| parse_time(&v))
        .unwrap_or(default)
}

/// Accepts `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
        .ok()
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:8080")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            store: StoreConfig {
                url: env_or("BOOKING_STORE_URL", "")
                    .trim_end_matches('/')
                    .to_string(),
                token: env::var("BOOKING_STORE_TOKEN").ok().filter(|s| !s.is_empty()),
                timeout_secs: env_or_parse("BOOKING_STORE_TIMEOUT_SECS", 10),
            },
            engine: EngineConfig {
                rates: RateCard {
                    ps5_per_player: env_or_positive("RATE_PS5_PER_30", defaults.rates.ps5_per_player),
                    simulator: env_or_positive("RATE_SIM_PER_30", defaults.rates.simulator),
                },
                grid: SlotGrid {
                    opening: env_or_time("OPENING_TIME", defaults.grid.opening),
                    closing: env_or_time("CLOSING_TIME", defaults.grid.closing),
                    step_minutes: env_or_parse("SLOT_STEP_MINUTES", defaults.grid.step_minutes),
                },
                max_ps5_players: env_or_parse("MAX_PS5_PLAYERS", defaults.max_ps5_players),
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: env_or_parse("RATE_LIMIT_MAX", 100),
                submit_max: env_or_parse("RATE_LIMIT_SUBMIT", 10),
            },
            checkout: CheckoutConfig {
                ttl_secs: env_or_parse("CHECKOUT_TTL_SECS", 1800),
                sweep_interval_secs: 60,
            },
        }
    }
}
