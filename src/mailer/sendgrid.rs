use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{MailError, Mailer, Template, TemplateVars, FROM_NAME, MAX_ATTEMPTS};

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    send_url: String,
}

impl SendGridMailer {
    pub fn new(api_key: &str, from_email: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            send_url: SEND_URL.to_string(),
        })
    }

    fn payload(&self, subject: &str, body: &str, username: &str, email: &str, sandbox: bool) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": email, "name": username }] }],
            "from": { "email": self.from_email, "name": FROM_NAME },
            "subject": subject,
            "content": [{ "type": "text/html", "value": body }],
            "mail_settings": { "sandbox_mode": { "enable": sandbox } },
        })
    }

    async fn attempt(&self, payload: &Value) -> Result<(), MailError> {
        let res = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(MailError::Rejected(res.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(
        &self,
        template: Template,
        username: &str,
        email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailError> {
        let (subject, body) = template.render(vars);
        let payload = self.payload(&subject, &body, username, email, sandbox);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(&payload).await {
                Ok(()) => {
                    info!(%email, attempt, "welcome email sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, %email, attempt, "failed to send email");
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    }
                }
            }
        }
        Err(MailError::Exhausted(MAX_ATTEMPTS))
    }
}
