//! Email notification channel (HTTP mail gateway, Mailgun-style API).

use async_trait::async_trait;

use super::{AlertKind, Notifier, NotifyError};
use crate::store::NotifySettings;

/// Sends email alerts through an HTTP mail gateway.
pub struct EmailNotifier {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    domain: String,
    from: String,
    to: String,
}

impl EmailNotifier {
    pub fn new(client: reqwest::Client, settings: &NotifySettings) -> Self {
        Self {
            client,
            api_base: settings.mail_api_base.clone(),
            api_key: settings.mail_api_key.clone(),
            domain: settings.mail_domain.clone(),
            from: settings.mail_from.clone(),
            to: settings.mail_to.clone(),
        }
    }

    fn configured(&self) -> bool {
        !self.api_base.is_empty()
            && !self.api_key.is_empty()
            && !self.domain.is_empty()
            && !self.from.is_empty()
            && !self.to.is_empty()
    }

    fn subject(kind: AlertKind, resource_name: &str) -> String {
        match kind {
            AlertKind::Down => format!("[PulseWatch] {} is DOWN", resource_name),
            AlertKind::Recovered => format!("[PulseWatch] {} recovered", resource_name),
            AlertKind::Test => "[PulseWatch] test alert".to_string(),
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(
        &self,
        kind: AlertKind,
        resource_name: &str,
        _resource_url: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if !self.configured() {
            return Err(NotifyError::NotConfigured("email"));
        }

        let url = format!(
            "{}/v3/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.domain
        );

        let subject = Self::subject(kind, resource_name);
        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
                ("subject", subject.as_str()),
                ("text", message),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!(
                "mail gateway returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_email_fails_fast() {
        let client = reqwest::Client::new();
        let notifier = EmailNotifier::new(client, &NotifySettings::default());
        let result = notifier
            .send(AlertKind::Down, "web", "http://web", "down")
            .await;
        assert!(matches!(result, Err(NotifyError::NotConfigured("email"))));
    }

    #[test]
    fn test_subject_lines() {
        assert_eq!(
            EmailNotifier::subject(AlertKind::Down, "api"),
            "[PulseWatch] api is DOWN"
        );
        assert_eq!(
            EmailNotifier::subject(AlertKind::Recovered, "api"),
            "[PulseWatch] api recovered"
        );
    }
}
