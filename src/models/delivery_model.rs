//! models/delivery_model.rs

/// Correo listo para el transporte, ya resuelto contra la campaña
/// (from de la config SMTP, destinatario y cuerpo de la fila reclamada).
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
}

/// Resumen de un lote procesado, solo para logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub tagged: usize,
    pub tag_failed: usize,
}
