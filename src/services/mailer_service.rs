//! services/mailer_service.rs
//! Transporte de correo detrás de un trait, con una fábrica que construye
//! un transporte por campaña a partir de su config SMTP (el equivalente de
//! `createTransport(smtp)`). Los tests sustituyen ambos por versiones
//! guionadas.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;

use crate::models::campaign_model::SmtpConfig;
use crate::models::delivery_model::OutgoingEmail;

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

pub trait MailerFactory: Send + Sync {
    fn build(&self, smtp: &SmtpConfig) -> Result<Arc<dyn MailTransport>>;
}

/// Fábrica de producción: SMTP asíncrono de lettre con timeout acotado.
#[derive(Debug, Clone)]
pub struct SmtpMailerFactory {
    timeout: Duration,
}

impl SmtpMailerFactory {
    pub fn new(timeout: Duration) -> Self {
        SmtpMailerFactory { timeout }
    }
}

impl MailerFactory for SmtpMailerFactory {
    fn build(&self, smtp: &SmtpConfig) -> Result<Arc<dyn MailTransport>> {
        let tls_params =
            TlsParameters::new(smtp.host.clone()).context("Invalid TLS parameters")?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .context("Invalid SMTP host")?
            .port(smtp.port);

        if let Some(auth) = &smtp.auth {
            builder = builder.credentials(Credentials::new(auth.user.clone(), auth.pass.clone()));
        }

        // secure: true → TLS implícito (465); false → STARTTLS obligatorio.
        builder = if smtp.secure {
            builder.tls(Tls::Wrapper(tls_params))
        } else {
            builder.tls(Tls::Required(tls_params))
        };

        Ok(Arc::new(SmtpTransportMailer {
            mailer: builder.build(),
            timeout: self.timeout,
        }))
    }
}

pub struct SmtpTransportMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

#[async_trait]
impl MailTransport for SmtpTransportMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let from: Mailbox = email.from.parse().context("Invalid from address")?;
        let to: Mailbox = email.to.parse().context("Invalid recipient address")?;

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone());

        let message = match &email.text {
            Some(text) => builder.multipart(MultiPart::alternative_plain_html(
                text.clone(),
                email.html.clone(),
            ))?,
            None => builder.singlepart(
                SinglePart::builder()
                    .header(ContentType::parse("text/html; charset=utf-8")?)
                    .body(email.html.clone()),
            )?,
        };

        // Un timeout cuenta como fallo de transporte: la fila queda pendiente.
        tokio::time::timeout(self.timeout, self.mailer.send(message))
            .await
            .context("SMTP send timed out")??;

        Ok(())
    }
}
