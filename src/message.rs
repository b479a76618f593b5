use std::collections::BTreeMap;

use askama::Template;
use chrono::{DateTime, Utc};

use crate::types::LeadRequest;

const NOT_SPECIFIED: &str = "Not specified";
const NONE: &str = "-";

#[derive(Template)]
#[template(path = "lead_email.html")]
struct LeadEmailHtml<'a> {
    name: &'a str,
    phone: &'a str,
    email: &'a str,
    preferred_date: &'a str,
    location: &'a str,
    message: &'a str,
    sent_at: String,
}

pub struct EmailContent {
    pub subject: String,
    pub html: String,
}

pub fn text_body(lead: &LeadRequest) -> String {
    format!(
        "New enquiry from website:\n\
         Name: {}\n\
         Email: {}\n\
         Phone: {}\n\
         Location: {}\n\
         Preferred date: {}\n\
         Message: {}",
        lead.name,
        lead.email.as_deref().unwrap_or(NONE),
        lead.phone,
        lead.location,
        lead.preferred_date.as_deref().unwrap_or(NOT_SPECIFIED),
        lead.message.as_deref().unwrap_or(NONE),
    )
}

/// Positional variables for the pre-approved WhatsApp template.
pub fn template_variables(lead: &LeadRequest) -> BTreeMap<String, String> {
    [
        lead.name.as_str(),
        lead.phone.as_str(),
        lead.location.as_str(),
        lead.preferred_date.as_deref().unwrap_or(NOT_SPECIFIED),
        lead.message.as_deref().unwrap_or(NONE),
    ]
    .iter()
    .enumerate()
    .map(|(i, value)| ((i + 1).to_string(), (*value).to_string()))
    .collect()
}

pub fn email_content(
    lead: &LeadRequest,
    sent_at: DateTime<Utc>,
) -> Result<EmailContent, askama::Error> {
    let html = LeadEmailHtml {
        name: &lead.name,
        phone: &lead.phone,
        email: lead.email.as_deref().unwrap_or(NONE),
        preferred_date: lead.preferred_date.as_deref().unwrap_or(NOT_SPECIFIED),
        location: &lead.location,
        message: lead.message.as_deref().unwrap_or("(None)"),
        sent_at: sent_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    }
    .render()?;

    Ok(EmailContent {
        subject: format!("New Demo Request - {}", lead.location),
        html,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn lead() -> LeadRequest {
        LeadRequest {
            name: "Asha".into(),
            phone: "+911234567890".into(),
            location: "Mumbai".into(),
            message: None,
            preferred_date: Some("2026-11-02".into()),
            email: None,
        }
    }

    #[test]
    fn text_body_fills_placeholders() {
        let body = text_body(&lead());
        assert!(body.starts_with("New enquiry from website:\nName: Asha\n"));
        assert!(body.contains("Email: -\n"));
        assert!(body.contains("Preferred date: 2026-11-02\n"));
        assert!(body.ends_with("Message: -"));
    }

    #[test]
    fn template_variables_are_positional() {
        let vars = template_variables(&lead());
        assert_eq!(vars.len(), 5);
        assert_eq!(vars["1"], "Asha");
        assert_eq!(vars["3"], "Mumbai");
        assert_eq!(vars["4"], "2026-11-02");
        assert_eq!(vars["5"], "-");
        assert_eq!(
            serde_json::to_string(&vars).unwrap(),
            r#"{"1":"Asha","2":"+911234567890","3":"Mumbai","4":"2026-11-02","5":"-"}"#
        );
    }

    #[test]
    fn email_escapes_user_input() {
        let mut lead = lead();
        lead.name = "<b>Asha</b>".into();
        let sent_at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let email = email_content(&lead, sent_at).unwrap();
        assert_eq!(email.subject, "New Demo Request - Mumbai");
        assert!(email.html.contains("Asha"));
        assert!(!email.html.contains("<b>Asha"));
        assert!(email.html.contains("2026-10-18 09:30 UTC"));
        assert!(email.html.contains("(None)"));
    }
}
