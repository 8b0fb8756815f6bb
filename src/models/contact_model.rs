//! models/contact_model.rs

use serde::Deserialize;

/// Fila de contacto lista para insertar en la cola de una campaña.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub email: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    /// Referencia opcional al documento en el store externo, para el
    /// tagueo post-envío.
    pub es_index: Option<String>,
    pub es_doc_id: Option<String>,
}

/// Fila reclamada por `ContactService::claim_pending`. Lleva todo lo que
/// necesita el ejecutor de entrega; el id permite marcarla enviada.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimedContact {
    pub id: i64,
    pub email: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub es_index: Option<String>,
    pub es_doc_id: Option<String>,
}

/// Lote reclamado bajo un token único. El token acota el reclamo a un solo
/// ciclo reclamar-y-entregar; al terminar se libera con `release_claims`.
#[derive(Debug, Clone)]
pub struct ClaimedBatch {
    pub token: String,
    pub contacts: Vec<ClaimedContact>,
}

impl ClaimedBatch {
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }
}

/// Candidato devuelto por el directorio de leads, todavía sin personalizar.
#[derive(Debug, Clone, Deserialize)]
pub struct Lead {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub es_index: Option<String>,
    #[serde(default)]
    pub es_doc_id: Option<String>,
}
