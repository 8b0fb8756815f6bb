//! services/lead_service.rs
//! Enriquecimiento: baja candidatos del directorio de leads, los
//! personaliza en filas de contacto y los inserta antes de la fase de envío.
//! Todo el módulo es colaborador, sin invariantes del core.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::models::campaign_model::Campaign;
use crate::models::contact_model::{Lead, NewContact};
use crate::services::contact_service::ContactService;

#[derive(Clone)]
pub struct LeadService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    contact_service: ContactService,
}

impl LeadService {
    pub fn new(
        base_url: String,
        api_key: String,
        contact_service: ContactService,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build lead directory client")?;
        Ok(LeadService {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            contact_service,
        })
    }

    /// fetch → personalize → insert. Se corre por campaña antes del envío;
    /// el iterador loguea cualquier error y la fase de envío corre igual.
    pub async fn enrich_campaign(&self, campaign: &Campaign) -> Result<u64> {
        let leads = self.fetch_leads(campaign, campaign.per_hour_limit).await?;
        if leads.is_empty() {
            log::info!("[{}] el directorio no devolvió leads", campaign.name);
            return Ok(0);
        }
        let contacts = personalize(campaign, &leads);
        self.contact_service
            .insert_contacts(&campaign.id, &contacts)
            .await
    }

    /// GET {base}/api/campaign-contacts con la query de targeting de la
    /// campaña serializada tal cual. Un status no-2xx es error con cuerpo.
    pub async fn fetch_leads(&self, campaign: &Campaign, count: i64) -> Result<Vec<Lead>> {
        if count <= 0 {
            return Ok(Vec::new());
        }

        let query_json = match &campaign.query {
            Some(q) => serde_json::to_string(q).context("Invalid campaign query")?,
            None => "{}".to_string(),
        };

        let url = format!("{}/api/campaign-contacts", self.base_url);
        let count_param = count.to_string();
        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(&[
                ("query", query_json.as_str()),
                ("noOfContactsToGet", count_param.as_str()),
                ("campaignId", campaign.id.as_str()),
            ])
            .send()
            .await
            .context("Lead directory request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Lead directory error: {} - {}", status, detail);
        }

        response
            .json::<Vec<Lead>>()
            .await
            .context("Invalid lead directory response")
    }
}

/// Convierte leads en filas de contacto. Gana el primer email del lead;
/// leads sin email se saltan.
// TODO: plantillas de asunto/cuerpo por campaña; por ahora un render fijo.
pub fn personalize(campaign: &Campaign, leads: &[Lead]) -> Vec<NewContact> {
    leads
        .iter()
        .filter_map(|lead| {
            let email = lead.emails.first()?.clone();
            Some(NewContact {
                email,
                subject: format!("test subject ({})", campaign.name),
                html: "<p>test email body</p>".to_string(),
                text: None,
                es_index: lead.es_index.clone(),
                es_doc_id: lead.es_doc_id.clone(),
            })
        })
        .collect()
}
