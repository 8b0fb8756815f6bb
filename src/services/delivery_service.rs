//! services/delivery_service.rs
//! Ejecutor de entrega: recorre el lote reclamado en secuencia, cada fila
//! aislada del fallo de las demás. Enviar → marcar → taguear; al final se
//! libera el token del reclamo pase lo que pase.

use chrono::Utc;
use std::sync::Arc;

use crate::models::campaign_model::{Campaign, SmtpConfig};
use crate::models::contact_model::{ClaimedBatch, ClaimedContact};
use crate::models::delivery_model::{BatchSummary, OutgoingEmail};
use crate::services::contact_service::ContactService;
use crate::services::mailer_service::MailTransport;
use crate::services::tagger_service::ContactTagger;

#[derive(Clone)]
pub struct DeliveryService {
    contact_service: ContactService,
    /// Ausente cuando no hay document store configurado; el paso de tagueo
    /// se salta por completo.
    tagger: Option<Arc<dyn ContactTagger>>,
}

impl DeliveryService {
    pub fn new(contact_service: ContactService, tagger: Option<Arc<dyn ContactTagger>>) -> Self {
        DeliveryService {
            contact_service,
            tagger,
        }
    }

    /// Procesa el lote completo y devuelve el resumen. Nunca aborta a mitad:
    /// un fallo de transporte deja esa fila pendiente y sigue con la próxima.
    pub async fn deliver_batch(
        &self,
        campaign: &Campaign,
        smtp: &SmtpConfig,
        transport: &dyn MailTransport,
        batch: &ClaimedBatch,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for contact in &batch.contacts {
            summary.attempted += 1;

            let email = OutgoingEmail {
                from: smtp.from.clone(),
                to: contact.email.clone(),
                subject: contact.subject.clone(),
                html: contact.html.clone(),
                text: contact.text.clone(),
            };

            match transport.send(&email).await {
                Ok(()) => {
                    summary.sent += 1;
                    log::info!("✓ {}", contact.email);

                    // El envío ya salió: si la marca falla, la fila vuelve al
                    // pool al liberar el token y se re-envía (at-least-once).
                    if let Err(e) = self.contact_service.mark_sent(contact.id, Utc::now()).await
                    {
                        log::error!(
                            "[{}] no se pudo marcar sent_at de {}: {:#}",
                            campaign.name,
                            contact.email,
                            e
                        );
                    }

                    self.tag_contact(campaign, contact, &mut summary).await;
                }
                Err(e) => {
                    summary.failed += 1;
                    log::warn!("✗ {}: {:#}", contact.email, e);
                }
            }
        }

        match self.contact_service.release_claims(&batch.token).await {
            Ok(released) if released > 0 => {
                log::debug!("[{}] {} reclamos liberados", campaign.name, released)
            }
            Ok(_) => {}
            Err(e) => log::error!("[{}] fallo al liberar reclamos: {:#}", campaign.name, e),
        }

        summary
    }

    /// Tag best-effort en el document store. Solo aplica a filas con
    /// back-reference; el resultado nunca altera el estado de entrega.
    async fn tag_contact(
        &self,
        campaign: &Campaign,
        contact: &ClaimedContact,
        summary: &mut BatchSummary,
    ) {
        let tagger = match &self.tagger {
            Some(t) => t,
            None => return,
        };
        let (index, doc_id) = match (&contact.es_index, &contact.es_doc_id) {
            (Some(index), Some(doc_id)) => (index, doc_id),
            _ => return,
        };

        let tag = format!("{}:{}", campaign.sender_key, campaign.id);
        match tagger.append_tag(index, doc_id, &tag).await {
            Ok(()) => summary.tagged += 1,
            Err(e) => {
                summary.tag_failed += 1;
                log::warn!(
                    "[{}] tag falló para {} ({}/{}): {:#}",
                    campaign.name,
                    contact.email,
                    index,
                    doc_id,
                    e
                );
            }
        }
    }
}
