//! services/campaign_service.rs
//! CRUD mínimo de campañas + bootstrap del esquema. El worker solo usa
//! `active_campaigns`; la creación existe para las herramientas de gestión.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::campaign_model::{Campaign, CreateCampaignRequest};

#[derive(Clone, Debug)]
pub struct CampaignService {
    db_pool: Pool<Sqlite>,
}

/// Fila cruda de `campaigns`; se convierte a `Campaign` parseando los
/// campos JSON y el timestamp.
#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: String,
    name: String,
    sender_key: String,
    query: Option<String>,
    use_net_new: i64,
    exclude_campaign_ids: Option<String>,
    smtp: String,
    per_hour_limit: i64,
    audience_size: Option<i64>,
    created_at: String,
}

impl CampaignRow {
    fn into_campaign(self) -> Result<Campaign> {
        let query = match self.query {
            Some(raw) => {
                Some(serde_json::from_str(&raw).context("Invalid campaign query JSON")?)
            }
            None => None,
        };
        let exclude_campaign_ids = match self.exclude_campaign_ids {
            Some(raw) => {
                serde_json::from_str(&raw).context("Invalid exclude_campaign_ids JSON")?
            }
            None => Vec::new(),
        };
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .context("Invalid campaign created_at")?
            .with_timezone(&Utc);

        Ok(Campaign {
            id: self.id,
            name: self.name,
            sender_key: self.sender_key,
            query,
            use_net_new: self.use_net_new != 0,
            exclude_campaign_ids,
            smtp_json: self.smtp,
            per_hour_limit: self.per_hour_limit,
            audience_size: self.audience_size,
            created_at,
        })
    }
}

const CAMPAIGN_COLUMNS: &str = "id, name, sender_key, query, use_net_new, \
     exclude_campaign_ids, smtp, per_hour_limit, audience_size, created_at";

impl CampaignService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CampaignService { db_pool }
    }

    /// Corre migraciones con sqlx (idempotente).
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run campaign migrations")?;
        Ok(())
    }

    /// Crea la campaña. Valida los campos obligatorios antes de insertar.
    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> Result<Campaign> {
        if req.name.trim().is_empty() {
            bail!("Campaign name is required");
        }
        if req.sender_key.trim().is_empty() {
            bail!("Campaign sender_key is required");
        }
        if req.smtp.host.trim().is_empty() || req.smtp.from.trim().is_empty() {
            bail!("Campaign SMTP config requires host and from");
        }
        if req.per_hour_limit < 0 {
            bail!("per_hour_limit must be >= 0");
        }
        if let Some(cap) = req.audience_size {
            if cap < 0 {
                bail!("audience_size must be >= 0");
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let query_json = match &req.query {
            Some(q) => Some(serde_json::to_string(q)?),
            None => None,
        };
        let exclude_json = serde_json::to_string(&req.exclude_campaign_ids)?;
        let smtp_json = serde_json::to_string(&req.smtp)?;
        let use_net_new = req.use_net_new as i64;

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, name, sender_key, query, use_net_new,
                exclude_campaign_ids, smtp, per_hour_limit, audience_size, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.sender_key)
        .bind(&query_json)
        .bind(use_net_new)
        .bind(&exclude_json)
        .bind(&smtp_json)
        .bind(req.per_hour_limit)
        .bind(req.audience_size)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar campaña")?;

        log::info!("✓ Campaña creada: {} (ID: {})", req.name, id);
        self.find_campaign(&id).await
    }

    /// Obtiene una campaña por id.
    pub async fn find_campaign(&self, id: &str) -> Result<Campaign> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
        let row: CampaignRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.db_pool)
            .await
            .context("No se encontró campaña con ese id")?;
        row.into_campaign()
    }

    /// Campañas con envío habilitado (`per_hour_limit > 0`), el working set
    /// del iterador. Una fila corrupta se loguea y se salta; no tumba el run.
    pub async fn active_campaigns(&self) -> Result<Vec<Campaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE per_hour_limit > 0 ORDER BY created_at"
        );
        let rows: Vec<CampaignRow> = sqlx::query_as(&sql)
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al cargar campañas activas")?;

        let mut campaigns = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match row.into_campaign() {
                Ok(c) => campaigns.push(c),
                Err(e) => log::error!("Campaña {} descartada: {:#}", id, e),
            }
        }
        Ok(campaigns)
    }
}
