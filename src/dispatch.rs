use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use reqwest::Client;

use crate::config::{Config, MessageMode, SuccessPolicy};
use crate::error::{AppError, ErrorCode};
use crate::message;
use crate::providers::{EmailClient, ProviderError, WhatsAppClient, WhatsAppContent};
use crate::router::{whatsapp_address, RecipientDirectory};
use crate::types::LeadRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    WhatsApp,
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WhatsApp => f.write_str("whatsapp"),
            Self::Email => f.write_str("email"),
        }
    }
}

/// Outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub channel: Channel,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DispatchResult {
    fn from_outcome(channel: Channel, outcome: Result<String, ProviderError>) -> Self {
        match outcome {
            Ok(id) => Self {
                channel,
                success: true,
                message_id: Some(id),
                error: None,
            },
            Err(e) => Self {
                channel,
                success: false,
                message_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

struct WhatsAppJob {
    client: WhatsAppClient,
    to: String,
    content: WhatsAppContent,
}

struct EmailJob {
    client: EmailClient,
    to: String,
}

impl EmailJob {
    async fn send(&self, lead: &LeadRequest) -> Result<String, ProviderError> {
        let email = message::email_content(lead, Utc::now())?;
        self.client.send(&self.to, &email.subject, &email.html).await
    }
}

/// Sends a validated lead over every enabled channel. Holds no mutable state;
/// one instance serves all requests.
pub struct Dispatcher {
    http: Client,
    config: Arc<Config>,
    directory: Option<RecipientDirectory>,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.provider_timeout).build()?;
        let directory = config
            .twilio
            .admin_whatsapp_to
            .as_ref()
            .map(|fallback| RecipientDirectory::new(config.recipients.iter().cloned(), fallback));
        Ok(Self {
            http,
            config,
            directory,
        })
    }

    /// Returns the message id to report on success.
    pub async fn dispatch(&self, lead: &LeadRequest) -> Result<Option<String>, AppError> {
        let channels = self.config.channels;
        let mut missing = Vec::new();
        let whatsapp = if channels.whatsapp {
            self.whatsapp_job(lead, &mut missing)
        } else {
            None
        };
        let email = if channels.email {
            self.email_job(&mut missing)
        } else {
            None
        };

        if !missing.is_empty() {
            let details = format!("missing configuration: {}", missing.join(", "));
            error!("Cannot dispatch lead, {}", details);
            return Err(AppError::with_details(ErrorCode::ServerConfig, details));
        }

        let whatsapp_send = async {
            match &whatsapp {
                Some(job) => Some(DispatchResult::from_outcome(
                    Channel::WhatsApp,
                    job.client.send(&job.to, &job.content).await,
                )),
                None => None,
            }
        };
        let email_send = async {
            match &email {
                Some(job) => Some(DispatchResult::from_outcome(
                    Channel::Email,
                    job.send(lead).await,
                )),
                None => None,
            }
        };
        let (whatsapp_result, email_result) = tokio::join!(whatsapp_send, email_send);
        let results: Vec<DispatchResult> = whatsapp_result.into_iter().chain(email_result).collect();

        for result in &results {
            match (&result.message_id, &result.error) {
                (Some(id), _) => info!("Lead sent via {} ({})", result.channel, id),
                (None, Some(e)) => warn!("Lead delivery via {} failed: {}", result.channel, e),
                (None, None) => {}
            }
        }

        let outcome = aggregate(self.config.success_policy, &results);
        if let Err(e) = &outcome {
            error!("Lead notification failed: {}", e);
        }
        outcome
    }

    fn whatsapp_job(&self, lead: &LeadRequest, missing: &mut Vec<&'static str>) -> Option<WhatsAppJob> {
        let twilio = &self.config.twilio;
        let template = self.config.message_mode == MessageMode::Template;
        require(&twilio.account_sid, "TWILIO_ACCOUNT_SID", missing);
        require(&twilio.auth_token, "TWILIO_AUTH_TOKEN", missing);
        require(&twilio.whatsapp_from, "TWILIO_WHATSAPP_FROM", missing);
        require(&self.directory, "ADMIN_WHATSAPP_TO", missing);
        if template {
            require(&twilio.template_sid, "TWILIO_TEMPLATE_SID", missing);
        }

        let (Some(sid), Some(token), Some(from), Some(directory)) = (
            &twilio.account_sid,
            &twilio.auth_token,
            &twilio.whatsapp_from,
            &self.directory,
        ) else {
            return None;
        };

        let content = if template {
            WhatsAppContent::Template {
                content_sid: twilio.template_sid.clone()?,
                variables: message::template_variables(lead),
            }
        } else {
            WhatsAppContent::Text(message::text_body(lead))
        };

        Some(WhatsAppJob {
            client: WhatsAppClient::new(
                self.http.clone(),
                &twilio.api_base,
                sid.clone(),
                token.clone(),
                whatsapp_address(from),
            ),
            to: directory.resolve(&lead.location).to_string(),
            content,
        })
    }

    fn email_job(&self, missing: &mut Vec<&'static str>) -> Option<EmailJob> {
        let resend = &self.config.resend;
        require(&resend.api_key, "RESEND_API_KEY", missing);
        require(&resend.from, "EMAIL_FROM", missing);
        require(&resend.admin_email_to, "ADMIN_EMAIL_TO", missing);

        let (Some(key), Some(from), Some(to)) = (&resend.api_key, &resend.from, &resend.admin_email_to)
        else {
            return None;
        };
        Some(EmailJob {
            client: EmailClient::new(self.http.clone(), &resend.api_base, key.clone(), from.clone()),
            to: to.clone(),
        })
    }
}

fn require<T>(value: &Option<T>, name: &'static str, missing: &mut Vec<&'static str>) {
    if value.is_none() {
        missing.push(name);
    }
}

/// Fold per-channel results into the response outcome. The first result is
/// the primary channel.
pub fn aggregate(policy: SuccessPolicy, results: &[DispatchResult]) -> Result<Option<String>, AppError> {
    let Some(primary) = results.first() else {
        return Err(AppError::with_details(
            ErrorCode::ServerConfig,
            "no notification channel enabled",
        ));
    };

    let delivered = match policy {
        SuccessPolicy::Primary => primary.success,
        SuccessPolicy::Any => results.iter().any(|r| r.success),
    };

    if delivered {
        let message_id = if primary.success {
            primary.message_id.clone()
        } else {
            results
                .iter()
                .find(|r| r.success)
                .and_then(|r| r.message_id.clone())
        };
        return Ok(message_id);
    }

    let details = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {}", r.channel, r.error.as_deref().unwrap_or("unknown error")))
        .collect::<Vec<_>>()
        .join("; ");
    Err(AppError::with_details(ErrorCode::ProviderSend, details))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(channel: Channel, id: &str) -> DispatchResult {
        DispatchResult {
            channel,
            success: true,
            message_id: Some(id.into()),
            error: None,
        }
    }

    fn failed(channel: Channel, error: &str) -> DispatchResult {
        DispatchResult {
            channel,
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }

    #[test]
    fn primary_policy_requires_primary_channel() {
        let results = [failed(Channel::WhatsApp, "timeout"), ok(Channel::Email, "em_1")];
        let err = aggregate(SuccessPolicy::Primary, &results).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderSend);
        assert_eq!(err.details.as_deref(), Some("whatsapp: timeout"));
    }

    #[test]
    fn primary_policy_ignores_secondary_failure() {
        let results = [ok(Channel::WhatsApp, "SM1"), failed(Channel::Email, "422")];
        assert_eq!(
            aggregate(SuccessPolicy::Primary, &results).unwrap(),
            Some("SM1".to_string())
        );
    }

    #[test]
    fn any_policy_accepts_secondary_success() {
        let results = [failed(Channel::WhatsApp, "timeout"), ok(Channel::Email, "em_1")];
        assert_eq!(
            aggregate(SuccessPolicy::Any, &results).unwrap(),
            Some("em_1".to_string())
        );
    }

    #[test]
    fn any_policy_fails_when_every_channel_fails() {
        let results = [failed(Channel::WhatsApp, "401"), failed(Channel::Email, "422")];
        let err = aggregate(SuccessPolicy::Any, &results).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProviderSend);
        assert_eq!(err.details.as_deref(), Some("whatsapp: 401; email: 422"));
    }

    #[test]
    fn no_results_is_a_config_error() {
        let err = aggregate(SuccessPolicy::Any, &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ServerConfig);
    }
}
