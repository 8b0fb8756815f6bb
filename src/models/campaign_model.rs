//! models/campaign_model.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campaña tal como la ve el worker. El core nunca la muta: se crea una vez
/// vía `CampaignService::create_campaign` y de ahí en adelante es solo lectura.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    /// Clave del tenant que envía; compone el tag `{sender_key}:{campaign_id}`
    /// en el document store.
    pub sender_key: String,
    /// Query de targeting, opaco para el core: se serializa tal cual hacia el
    /// directorio de leads.
    pub query: Option<serde_json::Value>,
    pub use_net_new: bool,
    pub exclude_campaign_ids: Vec<String>,
    /// JSON crudo de la configuración SMTP. Se parsea por campaña en el
    /// momento de enviar; un JSON inválido descarta la campaña, no el run.
    pub smtp_json: String,
    pub per_hour_limit: i64,
    /// Tope total de filas de contacto para la campaña (se aplica al insertar).
    pub audience_size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    pub fn smtp(&self) -> Result<SmtpConfig> {
        serde_json::from_str(&self.smtp_json).context("Invalid SMTP config JSON")
    }
}

/// Configuración SMTP por campaña, con el mismo esquema JSON que guarda
/// la tabla `campaigns` (host, port, secure, auth, from).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub auth: Option<SmtpAuth>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpAuth {
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub sender_key: String,
    pub query: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub use_net_new: bool,
    #[serde(default)]
    pub exclude_campaign_ids: Vec<String>,
    pub smtp: SmtpConfig,
    pub per_hour_limit: i64,
    pub audience_size: Option<i64>,
}

fn default_true() -> bool {
    true
}
