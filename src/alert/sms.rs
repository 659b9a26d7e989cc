//! SMS notification channel (Twilio REST API).

use async_trait::async_trait;

use super::{AlertKind, Notifier, NotifyError};
use crate::store::NotifySettings;

/// Sends SMS alerts through the Twilio messages endpoint.
pub struct SmsNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl SmsNotifier {
    pub fn new(client: reqwest::Client, settings: &NotifySettings) -> Self {
        Self {
            client,
            account_sid: settings.twilio_account_sid.clone(),
            auth_token: settings.twilio_auth_token.clone(),
            from: settings.twilio_from.clone(),
            to: settings.twilio_to.clone(),
        }
    }

    fn configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.from.is_empty()
            && !self.to.is_empty()
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send(
        &self,
        _kind: AlertKind,
        _resource_name: &str,
        _resource_url: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if !self.configured() {
            return Err(NotifyError::NotConfigured("sms"));
        }

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("From", self.from.as_str()),
                ("To", self.to.as_str()),
                ("Body", message),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!(
                "Twilio returned {}",
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
    async fn test_unconfigured_sms_fails_fast() {
        let client = reqwest::Client::new();
        let notifier = SmsNotifier::new(client, &NotifySettings::default());
        let result = notifier
            .send(AlertKind::Test, "web", "http://web", "hello")
            .await;
        assert!(matches!(result, Err(NotifyError::NotConfigured("sms"))));
    }
}
