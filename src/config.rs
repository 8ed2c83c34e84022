//! Service configuration.
//!
//! All environment access happens once, at startup, in
//! [`AppConfig::from_env`]. Payment provider credentials are carried as
//! plain structs so adapters can be constructed with injected values in
//! tests. A provider whose credentials are absent is simply not
//! configured; refunds against it fail with a descriptive outcome while
//! every other flow keeps working.

use anyhow::Context;

/// Credentials for the card processor.
#[derive(Debug, Clone)]
pub struct CardConfig {
    pub api_base: String,
    pub secret_key: String,
}

/// Credentials for the wallet processor.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub api_base: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub card: Option<CardConfig>,
    pub wallet: Option<WalletConfig>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// `DATABASE_URL` is required. Provider sections are optional as a
    /// whole but fatal if partially set, so a typo in one variable does
    /// not silently disable refunds.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("PORT is not a valid port number")?,
            Err(_) => 8084,
        };

        let card = match std::env::var("CARD_API_KEY") {
            Ok(secret_key) => Some(CardConfig {
                api_base: std::env::var("CARD_API_BASE")
                    .unwrap_or_else(|_| "https://api.cardprocessor.example/v1".to_string()),
                secret_key,
            }),
            Err(_) => None,
        };

        let wallet = match std::env::var("WALLET_CLIENT_ID") {
            Ok(client_id) => Some(WalletConfig {
                api_base: std::env::var("WALLET_API_BASE")
                    .unwrap_or_else(|_| "https://api.walletprocessor.example/v2".to_string()),
                client_id,
                client_secret: std::env::var("WALLET_CLIENT_SECRET")
                    .context("WALLET_CLIENT_ID is set but WALLET_CLIENT_SECRET is not")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            port,
            nats_url: std::env::var("NATS_URL").ok(),
            card,
            wallet,
        })
    }
}
