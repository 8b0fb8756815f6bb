//! Worker horario de campañas de email (cron: 0 * * * *  → boot → send → exit).

use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::worker_config::WorkerConfig;
use crate::logger::init_logger;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::delivery_service::DeliveryService;
use crate::services::lead_service::LeadService;
use crate::services::mailer_service::SmtpMailerFactory;
use crate::services::tagger_service::{ContactTagger, EsTagger};
use crate::services::worker_service::WorkerService;

mod config;
mod logger;
mod models;
mod services;
#[cfg(test)]
mod tests;

async fn setup_database(config: &WorkerConfig) -> Result<Pool<Sqlite>> {
    log::info!("Conectando a SQLite en {}", config.database_url);

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL inválida")?
        .create_if_missing(true);

    let db_pool = SqlitePool::connect_with(options)
        .await
        .context("No se pudo conectar a la base de datos SQLite")?;

    Ok(db_pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    // Config primero: si falta algo, salimos antes de tocar la DB.
    let config = WorkerConfig::from_env()?;

    let db_pool = setup_database(&config).await?;

    let campaign_service = CampaignService::new(db_pool.clone());
    campaign_service
        .run_migrations()
        .await
        .context("Fallo en migraciones")?;

    let contact_service = ContactService::new(db_pool.clone(), config.claim_ttl());

    let tagger: Option<Arc<dyn ContactTagger>> = match &config.es_node {
        Some(node) => Some(Arc::new(EsTagger::new(node.clone())?)),
        None => None,
    };
    let delivery_service = DeliveryService::new(contact_service.clone(), tagger);

    let lead_service = match &config.leads_api {
        Some(leads) => Some(LeadService::new(
            leads.base_url.clone(),
            leads.api_key.clone(),
            contact_service.clone(),
        )?),
        None => None,
    };

    let mailer_factory = Arc::new(SmtpMailerFactory::new(config.smtp_timeout()));

    let worker = WorkerService::new(
        campaign_service,
        contact_service,
        delivery_service,
        lead_service,
        mailer_factory,
    );

    // Salida 0 aunque fallen envíos individuales; solo el setup es fatal.
    worker.run().await
}
