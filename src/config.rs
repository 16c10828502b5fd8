use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub api_rps: u32,
    pub auth_rps: u32,
    /// Seconds of slack allowed past a test's closing time before a
    /// submission is rejected server-side.
    pub submission_grace_seconds: i64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            token_ttl_hours: get_env_parse_or("TOKEN_TTL_HOURS", 12)?,
            api_rps: get_env_parse_or("API_RPS", 100)?,
            auth_rps: get_env_parse_or("AUTH_RPS", 10)?,
            submission_grace_seconds: get_env_parse_or("SUBMISSION_GRACE_SECONDS", 60)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
