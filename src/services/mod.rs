//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" del worker.

pub mod campaign_service;
pub mod contact_service;
pub mod delivery_service;
pub mod lead_service;
pub mod mailer_service;
pub mod tagger_service;
pub mod worker_service;
