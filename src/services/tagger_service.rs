//! services/tagger_service.rs
//! Tag "contactado" en el document store externo. Siempre best-effort:
//! un fallo aquí se loguea y jamás toca el estado de entrega.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ContactTagger: Send + Sync {
    async fn append_tag(&self, index: &str, doc_id: &str, tag: &str) -> Result<()>;
}

/// Tagger de producción contra Elasticsearch: `POST {node}/{index}/_update/{doc_id}`
/// con un script painless que agrega el tag a `contacted_by` solo si falta
/// (idempotente; re-taguear no duplica).
#[derive(Debug, Clone)]
pub struct EsTagger {
    client: reqwest::Client,
    node: String,
}

impl EsTagger {
    pub fn new(node: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build ES client")?;
        Ok(EsTagger {
            client,
            node: node.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ContactTagger for EsTagger {
    async fn append_tag(&self, index: &str, doc_id: &str, tag: &str) -> Result<()> {
        let url = format!(
            "{}/{}/_update/{}",
            self.node,
            urlencoding::encode(index),
            urlencoding::encode(doc_id)
        );

        let body = serde_json::json!({
            "script": {
                "source": "if (ctx._source.contacted_by == null) { ctx._source.contacted_by = [params.tag] } else if (!ctx._source.contacted_by.contains(params.tag)) { ctx._source.contacted_by.add(params.tag) }",
                "lang": "painless",
                "params": { "tag": tag }
            },
            "upsert": { "contacted_by": [tag] }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("ES update request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("ES update error: {} - {}", status, detail);
        }
        Ok(())
    }
}
