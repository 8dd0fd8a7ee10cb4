//! Notification templates.

use dtrust_core::{CredentialId, Did, Email};
use dtrust_crypto::OneTimeCode;
use dtrust_gateway::Notification;

use crate::model::SubscriptionRecord;

/// Minimal HTML escaping for interpolated values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// The one-time code mail.
pub fn verification_code(to: &Email, code: &OneTimeCode, ttl_secs: i64) -> Notification {
    let minutes = (ttl_secs / 60).max(1);
    Notification {
        to: to.clone(),
        subject: "Your DecenTrust verification code".to_string(),
        text_body: format!(
            "Your verification code is {}. It expires in {minutes} minutes.",
            code.expose()
        ),
        html_body: format!(
            "<p>Your verification code is</p><h2>{}</h2><p>It expires in {minutes} minutes.</p>",
            code.expose()
        ),
    }
}

/// Payment confirmation.
pub fn subscription_confirmed(to: &Email, subscription: &SubscriptionRecord) -> Notification {
    let plan = subscription.plan_type.as_str();
    let end = subscription.end_date.to_iso8601();
    Notification {
        to: to.clone(),
        subject: "Machine to Machine purchase confirmation".to_string(),
        text_body: format!(
            "Thank you for subscribing to the {plan} plan. Your subscription runs for {} days, until {end}.",
            subscription.duration_days
        ),
        html_body: format!(
            "<p>Thank you for subscribing to the <b>{plan}</b> plan.</p><p>Your subscription runs for {} days, until {end}.</p>",
            subscription.duration_days
        ),
    }
}

/// The issued identifier and credential, including the compact JWT the
/// developer embeds in their service.
pub fn credentials_issued(
    to: &Email,
    did: &Did,
    credential_json: &str,
    credential_id: &CredentialId,
    compact: &str,
) -> Notification {
    Notification {
        to: to.clone(),
        subject: "Your credentials".to_string(),
        text_body: format!(
            "Your decentralized identifier: {did}\n\nCredential id: {credential_id}\n\nCredential JWT:\n{compact}\n\nCredential:\n{credential_json}\n"
        ),
        html_body: format!(
            "<p>Your decentralized identifier:</p><pre>{}</pre>\
             <p>Credential id:</p><pre>{}</pre>\
             <p>Credential JWT:</p><pre>{}</pre>\
             <p>Credential:</p><pre>{}</pre>",
            escape(did.as_str()),
            escape(credential_id.as_str()),
            escape(compact),
            escape(credential_json)
        ),
    }
}

/// Confirmation that the holder's credential link was verified.
pub fn credential_verified(to: &Email, profile_url: &str) -> Notification {
    Notification {
        to: to.clone(),
        subject: "Your code snippet has been verified.".to_string(),
        text_body: format!("Your code snippet has been verified. View your profile: {profile_url}"),
        html_body: format!(
            "<p>Your code snippet has been verified.</p><p><a href=\"{0}\">{0}</a></p>",
            escape(profile_url)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mail_carries_code_and_ttl() {
        let to = Email::new("a@example.com").unwrap();
        let code = OneTimeCode::from_submitted("482913");
        let mail = verification_code(&to, &code, 3600);
        assert!(mail.text_body.contains("482913"));
        assert!(mail.text_body.contains("60 minutes"));
        assert!(mail.html_body.contains("<h2>482913</h2>"));
    }

    #[test]
    fn credential_mail_escapes_json() {
        let to = Email::new("a@example.com").unwrap();
        let did = Did::new("did:dtrust:abcd").unwrap();
        let id = CredentialId::generate();
        let mail = credentials_issued(&to, &did, "{\"a\":\"<b>\"}", &id, "x.y.z");
        assert!(mail.html_body.contains("&lt;b&gt;"));
        assert!(mail.text_body.contains("x.y.z"));
        assert!(mail.text_body.contains(id.as_str()));
    }
}
