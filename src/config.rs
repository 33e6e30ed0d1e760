use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Comma separated; parsed into `AdminPolicy` at startup
    pub admin_emails: Vec<String>,
    pub meal_rate: f64,
    pub monthly_fee: f64,
    pub log_dir: String,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn required(var: Lookup, key: &str) -> Result<String> {
    var(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("{key} must be set"))
}

fn parsed<T>(var: Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(&|key: &str| env::var(key).ok())
    }

    pub fn from_vars(var: Lookup) -> Result<Self> {
        let meal_rate: f64 = parsed(var, "MEAL_RATE", 80.0)?;
        if !(meal_rate > 0.0) {
            return Err(anyhow!("MEAL_RATE must be positive"));
        }
        let monthly_fee: f64 = parsed(var, "MONTHLY_FEE", 3000.0)?;
        if !(monthly_fee > 0.0) {
            return Err(anyhow!("MONTHLY_FEE must be positive"));
        }

        Ok(Self {
            server_addr: required(var, "SERVER_ADDR")?,
            database_url: required(var, "DATABASE_URL")?,
            jwt_secret: required(var, "JWT_SECRET")?,
            access_token_ttl: parsed(var, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed(var, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed(var, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed(var, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed(var, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed(var, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: var("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            admin_emails: var("ADMIN_EMAILS")
                .map(|raw| {
                    raw.split(',')
                        .map(|e| e.trim().to_lowercase())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            meal_rate,
            monthly_fee,
            log_dir: var("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}
