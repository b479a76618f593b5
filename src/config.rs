//! Service configuration loaded from environment variables.
//!
//! Provider credentials are optional at startup. A missing credential for an
//! enabled channel is reported per request as `SERVER_CONFIG_ERROR`, before any
//! outbound call is made. No credential has a built-in default.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALLOWED_ORIGIN` - The single origin allowed to call the endpoint
//!
//! ## Provider
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_WHATSAPP_FROM`
//! - `ADMIN_WHATSAPP_TO` - Fallback WhatsApp recipient
//! - `WHATSAPP_RECIPIENTS` - `CITY=address` pairs, separated by `,` or `;`
//! - `TWILIO_TEMPLATE_SID` - Content template used when `MESSAGE_MODE=template`
//! - `RESEND_API_KEY`, `EMAIL_FROM`, `ADMIN_EMAIL_TO` - Email channel
//!
//! ## Optional
//! - `HOST` (default: 0.0.0.0), `PORT` (default: 3000)
//! - `NOTIFY_CHANNELS` - `whatsapp`, `email` or both (default: whatsapp)
//! - `MESSAGE_MODE` - `text` or `template` (default: text)
//! - `SUCCESS_POLICY` - `primary` or `any` (default: primary)
//! - `REQUIRE_MESSAGE` - `true` or `false` (default: false)
//! - `PROVIDER_TIMEOUT_SECS` (default: 10)
//! - `TWILIO_API_BASE`, `RESEND_API_BASE` - Provider base URLs

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;

use crate::router::normalize_location;

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";
pub const DEFAULT_RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageMode {
    Text,
    Template,
}

/// How the overall outcome is derived when more than one channel is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// The primary channel must succeed.
    Primary,
    /// Any channel succeeding is enough.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub whatsapp: bool,
    pub email: bool,
}

impl Channels {
    pub fn names(self) -> Vec<String> {
        let mut names = Vec::new();
        if self.whatsapp {
            names.push("whatsapp".to_string());
        }
        if self.email {
            names.push("email".to_string());
        }
        names
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<SecretString>,
    pub whatsapp_from: Option<String>,
    pub admin_whatsapp_to: Option<String>,
    pub template_sid: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: Option<SecretString>,
    pub from: Option<String>,
    pub admin_email_to: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub allowed_origin: HeaderValue,
    pub recipients: Vec<(String, String)>,
    pub twilio: TwilioConfig,
    pub resend: ResendConfig,
    pub channels: Channels,
    pub message_mode: MessageMode,
    pub success_policy: SuccessPolicy,
    pub require_message: bool,
    pub provider_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = parse_or(&get, "HOST", "0.0.0.0".parse::<IpAddr>().ok())?;
        let port = parse_or(&get, "PORT", Some(3000u16))?;

        let origin = get("ALLOWED_ORIGIN")
            .ok_or_else(|| ConfigError::MissingEnvVar("ALLOWED_ORIGIN".to_string()))?;
        let allowed_origin = HeaderValue::from_str(&origin)
            .map_err(|e| ConfigError::InvalidEnvVar("ALLOWED_ORIGIN".to_string(), e.to_string()))?;

        let recipients = match get("WHATSAPP_RECIPIENTS") {
            Some(raw) => parse_recipients(&raw)?,
            None => Vec::new(),
        };

        let twilio = TwilioConfig {
            account_sid: get("TWILIO_ACCOUNT_SID"),
            auth_token: get("TWILIO_AUTH_TOKEN").map(SecretString::from),
            whatsapp_from: whatsapp_number(&get, "TWILIO_WHATSAPP_FROM")?,
            admin_whatsapp_to: whatsapp_number(&get, "ADMIN_WHATSAPP_TO")?,
            template_sid: get("TWILIO_TEMPLATE_SID"),
            api_base: get("TWILIO_API_BASE").unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
        };

        let resend = ResendConfig {
            api_key: get("RESEND_API_KEY").map(SecretString::from),
            from: get("EMAIL_FROM"),
            admin_email_to: get("ADMIN_EMAIL_TO"),
            api_base: get("RESEND_API_BASE").unwrap_or_else(|| DEFAULT_RESEND_API_BASE.to_string()),
        };

        let channels = parse_channels(get("NOTIFY_CHANNELS").as_deref().unwrap_or("whatsapp"))?;

        let message_mode = match get("MESSAGE_MODE").as_deref().map(str::to_ascii_lowercase) {
            None => MessageMode::Text,
            Some(v) if v == "text" => MessageMode::Text,
            Some(v) if v == "template" => MessageMode::Template,
            Some(v) => return Err(invalid("MESSAGE_MODE", format!("unknown mode '{v}'"))),
        };

        let success_policy = match get("SUCCESS_POLICY").as_deref().map(str::to_ascii_lowercase) {
            None => SuccessPolicy::Primary,
            Some(v) if v == "primary" => SuccessPolicy::Primary,
            Some(v) if v == "any" => SuccessPolicy::Any,
            Some(v) => return Err(invalid("SUCCESS_POLICY", format!("unknown policy '{v}'"))),
        };

        let require_message = parse_or(&get, "REQUIRE_MESSAGE", Some(false))?;
        let timeout_secs: u64 = parse_or(&get, "PROVIDER_TIMEOUT_SECS", Some(10))?;
        if timeout_secs == 0 {
            return Err(invalid("PROVIDER_TIMEOUT_SECS", "must be greater than zero"));
        }

        Ok(Self {
            host,
            port,
            allowed_origin,
            recipients,
            twilio,
            resend,
            channels,
            message_mode,
            success_policy,
            require_message,
            provider_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.into())
}

fn parse_or<G, T>(get: &G, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(key, e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn whatsapp_number<G>(get: &G, key: &str) -> Result<Option<String>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(number) if !has_digits(&number) => {
            Err(invalid(key, format!("'{number}' is not a phone number")))
        }
        other => Ok(other),
    }
}

fn has_digits(number: &str) -> bool {
    number.chars().any(|c| c.is_ascii_digit())
}

fn parse_recipients(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::new();
    for pair in raw.split([',', ';']).map(str::trim).filter(|pair| !pair.is_empty()) {
        let (city, address) = pair
            .split_once('=')
            .ok_or_else(|| invalid("WHATSAPP_RECIPIENTS", format!("expected CITY=address, got '{pair}'")))?;
        let (city, address) = (city.trim(), address.trim());
        if city.is_empty() || address.is_empty() {
            return Err(invalid(
                "WHATSAPP_RECIPIENTS",
                format!("empty city or address in '{pair}'"),
            ));
        }
        if !has_digits(address) {
            return Err(invalid(
                "WHATSAPP_RECIPIENTS",
                format!("'{address}' for {city} is not a phone number"),
            ));
        }
        if !seen.insert(normalize_location(city)) {
            return Err(invalid(
                "WHATSAPP_RECIPIENTS",
                format!("{city} is listed more than once"),
            ));
        }
        recipients.push((city.to_string(), address.to_string()));
    }
    Ok(recipients)
}

fn parse_channels(raw: &str) -> Result<Channels, ConfigError> {
    let mut channels = Channels {
        whatsapp: false,
        email: false,
    };
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match name.to_ascii_lowercase().as_str() {
            "whatsapp" => channels.whatsapp = true,
            "email" => channels.email = true,
            other => return Err(invalid("NOTIFY_CHANNELS", format!("unknown channel '{other}'"))),
        }
    }
    if !channels.whatsapp && !channels.email {
        return Err(invalid("NOTIFY_CHANNELS", "at least one channel is required"));
    }
    Ok(channels)
}
