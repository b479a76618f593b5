//! Thin clients for the messaging (Twilio) and email (Resend) APIs.

use std::collections::BTreeMap;

use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected request (status={status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to encode template variables: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to render email: {0}")]
    Render(#[from] askama::Error),
}

pub enum WhatsAppContent {
    Text(String),
    Template {
        content_sid: String,
        variables: BTreeMap<String, String>,
    },
}

pub struct WhatsAppClient {
    http: Client,
    api_base: String,
    account_sid: String,
    auth_token: SecretString,
    from: String,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Deserialize)]
struct TwilioError {
    message: Option<String>,
    code: Option<i64>,
}

impl WhatsAppClient {
    pub fn new(
        http: Client,
        api_base: &str,
        account_sid: String,
        auth_token: SecretString,
        from: String,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from,
        }
    }

    /// Send one message and return the provider's message SID.
    pub async fn send(&self, to: &str, content: &WhatsAppContent) -> Result<String, ProviderError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );

        let mut form = vec![("From", self.from.clone()), ("To", to.to_string())];
        match content {
            WhatsAppContent::Text(body) => form.push(("Body", body.clone())),
            WhatsAppContent::Template {
                content_sid,
                variables,
            } => {
                form.push(("ContentSid", content_sid.clone()));
                form.push(("ContentVariables", serde_json::to_string(variables)?));
            }
        }

        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let message: TwilioMessage = resp.json().await?;
            return Ok(message.sid);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<TwilioError>(&body) {
            Ok(TwilioError {
                message: Some(message),
                code: Some(code),
            }) => format!("{message} (code {code})"),
            Ok(TwilioError {
                message: Some(message),
                ..
            }) => message,
            _ => body,
        };
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

pub struct EmailClient {
    http: Client,
    api_base: String,
    api_key: SecretString,
    from: String,
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendSent {
    id: String,
}

impl EmailClient {
    pub fn new(http: Client, api_base: &str, api_key: SecretString, from: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            from,
        }
    }

    /// Send one email and return the provider's email id.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String, ProviderError> {
        let url = format!("{}/emails", self.api_base);
        let payload = ResendEmail {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };

        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let sent: ResendSent = resp.json().await?;
            return Ok(sent.id);
        }

        Err(ProviderError::Rejected {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        })
    }
}
