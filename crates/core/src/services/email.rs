//! Outbound email.

use agora_common::{AppError, AppResult, config};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    pub port: u16,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
}

/// Mailgun configuration.
#[derive(Debug, Clone)]
pub struct MailgunConfig {
    /// Mailgun API key.
    pub api_key: String,
    /// Mailgun domain.
    pub domain: String,
    /// Use the EU region endpoint.
    pub eu_region: bool,
}

/// Email provider configuration.
#[derive(Debug, Clone)]
pub enum EmailProvider {
    /// SMTP via lettre.
    Smtp(SmtpConfig),
    /// Mailgun HTTP API.
    Mailgun(MailgunConfig),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub text_body: String,
}

/// Email service.
///
/// Constructed without a provider the service is disabled: sends are
/// logged and dropped, which keeps notification workers runnable in
/// development setups without an SMTP relay.
#[derive(Clone)]
pub struct EmailService {
    provider: Option<EmailProvider>,
    from_address: String,
    from_name: String,
    http_client: reqwest::Client,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    pub fn new(provider: Option<EmailProvider>, from_address: String, from_name: String) -> Self {
        Self {
            provider,
            from_address,
            from_name,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a disabled email service.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, String::new(), String::new())
    }

    /// Build from application configuration.
    pub fn from_config(email: Option<&config::EmailConfig>) -> AppResult<Self> {
        let Some(email) = email else {
            return Ok(Self::disabled());
        };

        let provider = match email.provider.as_str() {
            "smtp" => {
                let host = email.smtp_host.clone().ok_or_else(|| {
                    AppError::Config("email.smtp_host is required for the smtp provider".to_string())
                })?;
                EmailProvider::Smtp(SmtpConfig {
                    host,
                    port: email.smtp_port,
                    username: email.smtp_username.clone(),
                    password: email.smtp_password.clone(),
                })
            }
            "mailgun" => {
                let api_key = email.mailgun_api_key.clone().ok_or_else(|| {
                    AppError::Config(
                        "email.mailgun_api_key is required for the mailgun provider".to_string(),
                    )
                })?;
                let domain = email.mailgun_domain.clone().ok_or_else(|| {
                    AppError::Config(
                        "email.mailgun_domain is required for the mailgun provider".to_string(),
                    )
                })?;
                EmailProvider::Mailgun(MailgunConfig {
                    api_key,
                    domain,
                    eu_region: email.mailgun_eu_region,
                })
            }
            other => {
                return Err(AppError::Config(format!("unknown email provider: {other}")));
            }
        };

        Ok(Self::new(
            Some(provider),
            email.from_address.clone(),
            email.from_name.clone(),
        ))
    }

    /// Check whether outbound email is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Send an email.
    pub async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let Some(provider) = &self.provider else {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                "Email disabled, dropping message"
            );
            return Ok(());
        };

        match provider {
            EmailProvider::Smtp(smtp) => self.send_smtp(smtp, message).await,
            EmailProvider::Mailgun(mg) => self.send_mailgun(mg, message).await,
        }
    }

    async fn send_smtp(&self, smtp: &SmtpConfig, message: EmailMessage) -> AppResult<()> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_address)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid from address: {e}")))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject)
            .body(message.text_body)
            .map_err(|e| AppError::Internal(format!("failed to build email: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| AppError::Config(format!("invalid SMTP relay: {e}")))?
            .port(smtp.port);

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let transport = builder.build();
        transport
            .send(email)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;

        Ok(())
    }

    async fn send_mailgun(&self, mg: &MailgunConfig, message: EmailMessage) -> AppResult<()> {
        let base_url = if mg.eu_region {
            "https://api.eu.mailgun.net"
        } else {
            "https://api.mailgun.net"
        };

        let form_params = vec![
            (
                "from",
                format!("{} <{}>", self.from_name, self.from_address),
            ),
            ("to", message.to),
            ("subject", message.subject),
            ("text", message.text_body),
        ];

        let response = self
            .http_client
            .post(format!("{}/v3/{}/messages", base_url, mg.domain))
            .basic_auth("api", Some(&mg.api_key))
            .form(&form_params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Mailgun request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            #[derive(Deserialize)]
            struct MailgunError {
                message: Option<String>,
            }
            let body: MailgunError = response
                .json()
                .await
                .unwrap_or(MailgunError { message: None });
            Err(AppError::ExternalService(format!(
                "Mailgun returned {status}: {}",
                body.message.unwrap_or_default()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_drops_messages() {
        let service = EmailService::disabled();
        assert!(!service.is_enabled());

        let result = service
            .send(EmailMessage {
                to: "someone@example.com".to_string(),
                subject: "s".to_string(),
                text_body: "b".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let email = config::EmailConfig {
            provider: "pigeon".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Agora".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_eu_region: false,
        };
        assert!(matches!(
            EmailService::from_config(Some(&email)),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_smtp_requires_host() {
        let email = config::EmailConfig {
            provider: "smtp".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Agora".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_eu_region: false,
        };
        assert!(matches!(
            EmailService::from_config(Some(&email)),
            Err(AppError::Config(_))
        ));
    }
}
