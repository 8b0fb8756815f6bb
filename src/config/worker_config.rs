//! config/worker_config.rs
//! Configuración del worker leída del entorno (.env en local, variables en Railway).
//! Toda la validación ocurre aquí, antes de tocar la base de datos.

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Par de credenciales para el directorio de leads. El enriquecimiento solo
/// se activa si las dos variables están presentes.
#[derive(Debug, Clone)]
pub struct LeadsApiConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub leads_api: Option<LeadsApiConfig>,
    pub es_node: Option<String>,
    pub smtp_timeout_secs: u64,
    pub claim_ttl_minutes: i64,
}

impl WorkerConfig {
    /// Construye la configuración desde el entorno. Junta TODAS las variables
    /// faltantes en un solo error para que el deploy falle con un mensaje completo.
    pub fn from_env() -> Result<Self> {
        let mut missing: Vec<&str> = Vec::new();

        let database_url = read_var("DATABASE_URL");
        if database_url.is_none() {
            missing.push("DATABASE_URL");
        }

        let leads_url = read_var("LEADS_API_URL");
        let leads_key = read_var("LEADS_API_KEY");
        let leads_api = match (leads_url, leads_key) {
            (Some(base_url), Some(api_key)) => Some(LeadsApiConfig { base_url, api_key }),
            (None, None) => None,
            (Some(_), None) => {
                missing.push("LEADS_API_KEY");
                None
            }
            (None, Some(_)) => {
                missing.push("LEADS_API_URL");
                None
            }
        };

        if !missing.is_empty() {
            bail!("Missing env vars: {}", missing.join(", "));
        }

        let smtp_timeout_secs = match read_var("SMTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("SMTP_TIMEOUT_SECS debe ser un entero de segundos")?,
            None => 30,
        };

        let claim_ttl_minutes = match read_var("CLAIM_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .context("CLAIM_TTL_MINUTES debe ser un entero de minutos")?,
            None => 15,
        };
        if claim_ttl_minutes <= 0 {
            bail!("CLAIM_TTL_MINUTES debe ser mayor que cero");
        }

        Ok(WorkerConfig {
            // unwrap seguro: ya validamos arriba
            database_url: database_url.unwrap_or_default(),
            leads_api,
            es_node: read_var("ES_NODE"),
            smtp_timeout_secs,
            claim_ttl_minutes,
        })
    }

    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp_timeout_secs)
    }

    pub fn claim_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.claim_ttl_minutes)
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
