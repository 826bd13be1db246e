//! Outbound transactional mail.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod sendgrid;

pub use sendgrid::SendGridMailer;

pub const FROM_NAME: &str = "Social";
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message with status {0}")]
    Rejected(u16),
    #[error("mail not delivered after {0} attempts")]
    Exhausted(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    UserWelcome,
}

/// Values interpolated into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub username: String,
    pub activation_url: String,
}

impl Template {
    /// Returns `(subject, html body)`.
    pub fn render(self, vars: &TemplateVars) -> (String, String) {
        match self {
            Template::UserWelcome => (
                "Finish registration with Social".to_string(),
                format!(
                    "<p>Hi {},</p>\
                     <p>Thanks for signing up. Confirm your email to activate your account:</p>\
                     <p><a href=\"{url}\">{url}</a></p>\
                     <p>If you did not sign up you can ignore this email.</p>",
                    vars.username,
                    url = vars.activation_url,
                ),
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// `sandbox` asks the provider to validate the message without delivering it.
    async fn send(
        &self,
        template: Template,
        username: &str,
        email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailError>;
}

/// Used when no provider key is configured: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: Template,
        username: &str,
        email: &str,
        vars: &TemplateVars,
        sandbox: bool,
    ) -> Result<(), MailError> {
        let (subject, _) = template.render(vars);
        info!(%username, %email, %subject, sandbox, activation_url = %vars.activation_url, "mail not sent, no provider configured");
        Ok(())
    }
}
