//! services/contact_service.rs
//! Dueño del estado pendiente/enviado de cada contacto: cuota rodante,
//! reclamo no bloqueante de lotes y marca monotónica de `sent_at`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::campaign_model::Campaign;
use crate::models::contact_model::{ClaimedBatch, ClaimedContact, NewContact};

#[derive(Clone, Debug)]
pub struct ContactService {
    db_pool: Pool<Sqlite>,
    /// Edad a partir de la cual un reclamo sin liberar se considera
    /// abandonado (proceso muerto) y sus filas vuelven a ser reclamables.
    claim_ttl: Duration,
}

impl ContactService {
    pub fn new(db_pool: Pool<Sqlite>, claim_ttl: Duration) -> Self {
        ContactService { db_pool, claim_ttl }
    }

    /// Contactos de la campaña enviados desde `since` (inclusive).
    pub async fn count_sent_since(
        &self,
        campaign_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
              FROM campaign_contacts
             WHERE campaign_id = ?1
               AND sent_at IS NOT NULL
               AND sent_at >= ?2
            "#,
        )
        .bind(campaign_id)
        .bind(since.to_rfc3339())
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al contar contactos enviados")?;
        Ok(n)
    }

    /// Cuota restante de la hora rodante: `per_hour_limit` menos lo enviado
    /// en los últimos 60 minutos, nunca negativa. Lectura pura.
    pub async fn remaining_quota(&self, campaign: &Campaign) -> Result<i64> {
        let since = Utc::now() - Duration::hours(1);
        let sent_last_hour = self.count_sent_since(&campaign.id, since).await?;
        Ok((campaign.per_hour_limit - sent_last_hour).max(0))
    }

    /// Reclama hasta `limit` filas pendientes de la campaña, las más viejas
    /// primero, marcándolas con un token fresco en un solo UPDATE atómico.
    ///
    /// SQLite no tiene `FOR UPDATE SKIP LOCKED`; el equivalente es este
    /// compare-and-swap condicional: una fila con `claimed_by` vigente es
    /// invisible para otros reclamos (se salta, nunca se espera), y un
    /// reclamo más viejo que el TTL cuenta como abandonado y se roba.
    /// Dos workers concurrentes jamás obtienen la misma fila porque el
    /// UPDATE es un solo statement y SQLite serializa escritores.
    pub async fn claim_pending(&self, campaign_id: &str, limit: i64) -> Result<ClaimedBatch> {
        let token = Uuid::new_v4().to_string();
        if limit <= 0 {
            return Ok(ClaimedBatch {
                token,
                contacts: Vec::new(),
            });
        }

        let now = Utc::now();
        let stale_cutoff = (now - self.claim_ttl).to_rfc3339();

        let mut contacts: Vec<ClaimedContact> = sqlx::query_as(
            r#"
            UPDATE campaign_contacts
               SET claimed_by = ?1, claimed_at = ?2
             WHERE id IN (
                   SELECT id
                     FROM campaign_contacts
                    WHERE campaign_id = ?3
                      AND sent_at IS NULL
                      AND (claimed_by IS NULL OR claimed_at < ?4)
                    ORDER BY id
                    LIMIT ?5
             )
            RETURNING id, email, subject, html, text, es_index, es_doc_id
            "#,
        )
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(campaign_id)
        .bind(&stale_cutoff)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al reclamar contactos pendientes")?;

        // RETURNING no garantiza orden; el ejecutor espera oldest-first.
        contacts.sort_by_key(|c| c.id);

        Ok(ClaimedBatch { token, contacts })
    }

    /// Fija `sent_at` una sola vez. El guard `sent_at IS NULL` hace la
    /// transición monotónica: un timestamp ya puesto nunca se pisa.
    pub async fn mark_sent(&self, contact_id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE campaign_contacts
               SET sent_at = ?1
             WHERE id = ?2
               AND sent_at IS NULL
            "#,
        )
        .bind(sent_at.to_rfc3339())
        .bind(contact_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar contacto como enviado")?;
        Ok(())
    }

    /// Libera todas las filas del token; las no enviadas vuelven al pool
    /// pendiente. Devuelve cuántas filas se liberaron.
    pub async fn release_claims(&self, token: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE campaign_contacts
               SET claimed_by = NULL, claimed_at = NULL
             WHERE claimed_by = ?1
            "#,
        )
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al liberar reclamos")?;
        Ok(result.rows_affected())
    }

    /// Filas aún pendientes de la campaña.
    pub async fn pending_count(&self, campaign_id: &str) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campaign_contacts WHERE campaign_id = ?1 AND sent_at IS NULL",
        )
        .bind(campaign_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al contar contactos pendientes")?;
        Ok(n)
    }

    /// Inserta contactos respetando el tope total de la campaña
    /// (`audience_size`) y la unicidad `(campaign_id, email)`: duplicados se
    /// ignoran en silencio, filas sin email/subject/html se saltan con un
    /// warning. Devuelve cuántas filas quedaron realmente insertadas.
    pub async fn insert_contacts(
        &self,
        campaign_id: &str,
        contacts: &[NewContact],
    ) -> Result<u64> {
        let audience_size: Option<Option<i64>> =
            sqlx::query_scalar("SELECT audience_size FROM campaigns WHERE id = ?1")
                .bind(campaign_id)
                .fetch_optional(&self.db_pool)
                .await
                .context("Fallo al verificar la campaña")?;
        let audience_size = match audience_size {
            Some(cap) => cap,
            None => bail!("Campaign with ID {} not found", campaign_id),
        };

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campaign_contacts WHERE campaign_id = ?1",
        )
        .bind(campaign_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Fallo al contar contactos existentes")?;

        let mut remaining = audience_size.map(|cap| (cap - existing).max(0));
        let mut inserted: u64 = 0;

        for contact in contacts {
            if contact.email.trim().is_empty()
                || contact.subject.trim().is_empty()
                || contact.html.trim().is_empty()
            {
                log::warn!(
                    "Contacto omitido por campos faltantes: {}",
                    if contact.email.is_empty() {
                        "unknown"
                    } else {
                        &contact.email
                    }
                );
                continue;
            }
            if remaining == Some(0) {
                log::warn!(
                    "[{}] audience_size alcanzado; se descartan los contactos restantes",
                    campaign_id
                );
                break;
            }

            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO campaign_contacts (
                    campaign_id, email, subject, html, text,
                    es_index, es_doc_id, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(campaign_id)
            .bind(&contact.email)
            .bind(&contact.subject)
            .bind(&contact.html)
            .bind(&contact.text)
            .bind(&contact.es_index)
            .bind(&contact.es_doc_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db_pool)
            .await
            .context("Fallo al insertar contacto")?;

            // Un duplicado ignorado no consume cupo.
            if result.rows_affected() > 0 {
                inserted += 1;
                if let Some(r) = remaining.as_mut() {
                    *r -= 1;
                }
            }
        }

        log::info!("✓ Insertados {} contactos para campaña {}", inserted, campaign_id);
        Ok(inserted)
    }
}
