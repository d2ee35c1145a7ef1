use std::env;

/// Default solve parameters, overridable by CLI flags and falling back to
/// `.env`/environment variables (mirrors `backend/src/config.rs`'s
/// `Config::from_env`, the teacher's division between env-driven defaults
/// and explicit overrides).
#[derive(Clone, Debug)]
pub struct Config {
    pub elevator_duration: f32,
    pub fallback_cost: f32,
    pub blocking_fallback_cost: f32,
    pub iterations: usize,
    pub price_increment: f32,
    pub rounds: usize,
    pub threads: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            elevator_duration: env::var("ELEVATOR_DURATION").unwrap_or_else(|_| "5.0".to_string()).parse()?,
            fallback_cost: env::var("FALLBACK_COST").unwrap_or_else(|_| "50.0".to_string()).parse()?,
            blocking_fallback_cost: env::var("BLOCKING_FALLBACK_COST").unwrap_or_else(|_| "0.0".to_string()).parse()?,
            iterations: env::var("ITERATIONS").unwrap_or_else(|_| "500".to_string()).parse()?,
            price_increment: env::var("PRICE_INCREMENT").unwrap_or_else(|_| "1.0".to_string()).parse()?,
            rounds: env::var("ROUNDS").unwrap_or_else(|_| "20".to_string()).parse()?,
            threads: env::var("THREADS").unwrap_or_else(|_| "1".to_string()).parse()?,
        })
    }
}
