//! services/worker_service.rs
//! Iterador de campañas: el run de una hora. Carga las campañas activas y
//! para cada una corre enriquecimiento opcional → cuota → reclamo → entrega,
//! en secuencia. El fallo de una campaña no frena a las demás.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::models::campaign_model::Campaign;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::delivery_service::DeliveryService;
use crate::services::lead_service::LeadService;
use crate::services::mailer_service::MailerFactory;

pub struct WorkerService {
    campaign_service: CampaignService,
    contact_service: ContactService,
    delivery_service: DeliveryService,
    lead_service: Option<LeadService>,
    mailer_factory: Arc<dyn MailerFactory>,
}

impl WorkerService {
    pub fn new(
        campaign_service: CampaignService,
        contact_service: ContactService,
        delivery_service: DeliveryService,
        lead_service: Option<LeadService>,
        mailer_factory: Arc<dyn MailerFactory>,
    ) -> Self {
        WorkerService {
            campaign_service,
            contact_service,
            delivery_service,
            lead_service,
            mailer_factory,
        }
    }

    /// Un run completo del worker. Solo es Err si ni siquiera se pudo cargar
    /// la lista de campañas (fallo de setup); todo lo demás se contiene.
    pub async fn run(&self) -> Result<()> {
        log::info!("Worker started");

        let campaigns = self
            .campaign_service
            .active_campaigns()
            .await
            .context("No se pudo cargar la lista de campañas")?;

        for campaign in &campaigns {
            if let Some(lead_service) = &self.lead_service {
                if let Err(e) = lead_service.enrich_campaign(campaign).await {
                    log::error!("[{}] enriquecimiento falló: {:#}", campaign.name, e);
                }
            }

            if let Err(e) = self.send_for_campaign(campaign).await {
                log::error!("[{}] procesamiento falló: {:#}", campaign.name, e);
            }
        }

        log::info!("Worker finished");
        Ok(())
    }

    /// Fase de envío de una campaña: cuota rodante → reclamo → entrega.
    /// El SMTP se parsea y el transporte se construye ANTES de reclamar,
    /// para no dejar filas reclamadas si la config está rota.
    pub async fn send_for_campaign(&self, campaign: &Campaign) -> Result<()> {
        let smtp = campaign.smtp()?;
        let transport = self
            .mailer_factory
            .build(&smtp)
            .context("No se pudo construir el transporte SMTP")?;

        let quota = self.contact_service.remaining_quota(campaign).await?;
        if quota <= 0 {
            log::info!("[{}] quota reached", campaign.name);
            return Ok(());
        }

        let batch = self.contact_service.claim_pending(&campaign.id, quota).await?;
        if batch.is_empty() {
            log::info!("[{}] nothing pending", campaign.name);
            return Ok(());
        }

        log::info!("[{}] sending {} email(s)…", campaign.name, batch.len());

        let summary = self
            .delivery_service
            .deliver_batch(campaign, &smtp, transport.as_ref(), &batch)
            .await;

        log::info!(
            "[{}] batch: {} attempted, {} sent, {} failed, {} tagged, {} tag errors",
            campaign.name,
            summary.attempted,
            summary.sent,
            summary.failed,
            summary.tagged,
            summary.tag_failed
        );

        Ok(())
    }
}
