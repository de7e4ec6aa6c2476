use std::{env, net::IpAddr};

use chrono::Duration;
use log::*;
use vault_common::{parse_boolean_flag, Secret};
use vault_engine::{
    sessions::{DEFAULT_REFRESH_WINDOW_MINS, DEFAULT_SESSION_LIFETIME_MINS},
    SessionConfig,
};

const DEFAULT_VAULT_HOST: &str = "127.0.0.1";
const DEFAULT_VAULT_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/vault.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub paystack: PaystackConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the connection's
    /// remote address.
    pub use_forwarded: bool,
    pub sessions: SessionConfig,
    /// Mark the session cookie `Secure`. Only turn this off for local development over plain HTTP.
    pub secure_cookies: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PaystackConfig {
    /// Signs the webhooks Paystack sends us
    pub secret_key: Secret<String>,
    /// Handed to the client so that it can open a payment with Paystack
    pub public_key: String,
    /// If supplied, webhook calls from any other address are refused.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_VAULT_HOST.to_string(),
            port: DEFAULT_VAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            paystack: PaystackConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            sessions: SessionConfig::default(),
            secure_cookies: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("VAULT_HOST").ok().unwrap_or_else(|| DEFAULT_VAULT_HOST.into());
        let port = env::var("VAULT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for VAULT_PORT. {e} Using the default, {DEFAULT_VAULT_PORT}, \
                         instead."
                    );
                    DEFAULT_VAULT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_VAULT_PORT);
        let database_url = env::var("VAULT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ VAULT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let paystack = PaystackConfig::from_env_or_defaults();
        let use_x_forwarded_for = parse_boolean_flag(env::var("VAULT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("VAULT_USE_FORWARDED").ok(), false);
        let secure_cookies = parse_boolean_flag(env::var("VAULT_SECURE_COOKIES").ok(), true);
        if !secure_cookies {
            warn!("🚨️ Session cookies will be sent over plain HTTP. Do not run production like this.");
        }
        let sessions = configure_sessions();
        Self { host, port, database_url, paystack, use_x_forwarded_for, use_forwarded, sessions, secure_cookies }
    }
}

impl PaystackConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret_key = env::var("VAULT_PAYSTACK_SECRET_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ VAULT_PAYSTACK_SECRET_KEY is not set. Every payment webhook will be rejected with 401 Unauthorized \
                 until it is set to your Paystack secret key."
            );
            String::default()
        });
        let public_key = env::var("VAULT_PAYSTACK_PUBLIC_KEY").ok().unwrap_or_else(|| {
            warn!("🪛️ VAULT_PAYSTACK_PUBLIC_KEY is not set. Clients will not be able to open payments.");
            String::default()
        });
        let whitelist = env::var("VAULT_PAYSTACK_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Paystack IP whitelist was configured, but is empty. The server will run, but won't accept \
                     any payment webhooks."
                );
            },
            None => {
                info!("🪛️ No Paystack IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Paystack IP whitelist: {addrs}");
            },
        }
        Self { secret_key: Secret::new(secret_key), public_key, whitelist }
    }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" turn the whitelist off. Invalid entries are
/// skipped with a warning.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!("🪛️ Paystack IP whitelist is disabled.");
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in VAULT_PAYSTACK_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn minutes_from_env(name: &str, default: i64) -> Duration {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default} minutes."))
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
                .and_then(|m| {
                    if m > 0 {
                        Ok(m)
                    } else {
                        warn!("🪛️ {name} must be positive. Got {m}.");
                        Err(())
                    }
                })
        })
        .map(Duration::minutes)
        .ok()
        .unwrap_or_else(|| Duration::minutes(default))
}

fn configure_sessions() -> SessionConfig {
    let maximum_lifetime = minutes_from_env("VAULT_SESSION_LIFETIME_MINS", DEFAULT_SESSION_LIFETIME_MINS);
    let refresh_window = minutes_from_env("VAULT_SESSION_REFRESH_MINS", DEFAULT_REFRESH_WINDOW_MINS);
    if refresh_window > maximum_lifetime {
        warn!("🪛️ The session refresh window is longer than the session lifetime. Cookies will last for the lifetime.");
    }
    SessionConfig { maximum_lifetime, refresh_window }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need. Secrets are excluded so that they aren't passed
/// around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub paystack_whitelist: Option<Vec<IpAddr>>,
    pub paystack_public_key: String,
    pub secure_cookies: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            paystack_whitelist: config.paystack.whitelist.clone(),
            paystack_public_key: config.paystack.public_key.clone(),
            secure_cookies: config.secure_cookies,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
