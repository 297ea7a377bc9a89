use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub gemini_api_key: Option<String>,
    pub scoring_model_field: String,
    pub scoring_model_administrative: String,
    pub scoring_timeout_secs: u64,
    pub audio_path_marker: String,
    pub public_rps: u32,
    pub company_rps: u32,
    pub premium_threshold: i64,
    pub signup_credits: i64,
    pub bootstrap_codes: HashMap<String, i64>,
    pub recovery_poll_ms: u64,
    pub stale_analysis_minutes: i64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            jwt_secret: get_env("JWT_SECRET")?,
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.trim().is_empty()),
            scoring_model_field: get_env_or("SCORING_MODEL_FIELD", "gemini-2.5-flash"),
            scoring_model_administrative: get_env_or(
                "SCORING_MODEL_ADMINISTRATIVE",
                "gemini-3-pro-preview",
            ),
            scoring_timeout_secs: get_env_parse_or("SCORING_TIMEOUT_SECS", 120)?,
            audio_path_marker: get_env_or(
                "AUDIO_PATH_MARKER",
                "/storage/v1/object/public/audios/",
            ),
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            company_rps: get_env_parse_or("COMPANY_RPS", 50)?,
            premium_threshold: get_env_parse_or("PREMIUM_THRESHOLD", 50)?,
            signup_credits: get_env_parse_or("SIGNUP_CREDITS", 3)?,
            bootstrap_codes: parse_bootstrap_codes(&get_env_or("BOOTSTRAP_CODES", "START:3"))?,
            recovery_poll_ms: get_env_parse_or("RECOVERY_POLL_MS", 750)?,
            stale_analysis_minutes: get_env_parse_or("STALE_ANALYSIS_MINUTES", 15)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Parses `CODE:amount` pairs separated by commas, e.g. `START:3,WELCOME:5`.
pub fn parse_bootstrap_codes(raw: &str) -> Result<HashMap<String, i64>> {
    let mut codes = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (code, amount) = entry.split_once(':').ok_or_else(|| {
            Error::Config(format!("Invalid bootstrap code entry: {}", entry))
        })?;
        let amount: i64 = amount
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bootstrap amount for {}: {}", code, e)))?;
        if amount < 1 {
            return Err(Error::Config(format!(
                "Bootstrap code {} must grant at least one credit",
                code
            )));
        }
        codes.insert(code.trim().to_uppercase(), amount);
    }
    Ok(codes)
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_codes_are_uppercased_and_parsed() {
        let codes = parse_bootstrap_codes("start:3, Welcome:10").unwrap();
        assert_eq!(codes.get("START"), Some(&3));
        assert_eq!(codes.get("WELCOME"), Some(&10));
    }

    #[test]
    fn bootstrap_codes_reject_malformed_entries() {
        assert!(parse_bootstrap_codes("START").is_err());
        assert!(parse_bootstrap_codes("START:zero").is_err());
        assert!(parse_bootstrap_codes("START:0").is_err());
        assert!(parse_bootstrap_codes("").unwrap().is_empty());
    }
}
