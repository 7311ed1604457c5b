pub mod common;
pub mod dashboard;
pub mod factories;
pub mod hisab;
pub mod parties;
pub mod payments;
pub mod transactions;

use crate::{
    config::GstinConfig,
    db::DbPool,
    errors::ServiceError,
    services::{
        counterparties::{FactoryService, PartyService},
        gstin::GstinVerifier,
        hisab::HisabService,
        payments::PaymentRecorder,
        summary::SummaryService,
        transactions::TransactionRecorder,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub parties: Arc<PartyService>,
    pub factories: Arc<FactoryService>,
    pub transactions: Arc<TransactionRecorder>,
    pub payments: Arc<PaymentRecorder>,
    pub summaries: Arc<SummaryService>,
    pub hisab: Arc<HisabService>,
    pub gstin: Arc<GstinVerifier>,
}

impl AppServices {
    /// Wires every service to the shared pool.
    pub fn new(db_pool: Arc<DbPool>, gstin: GstinConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            parties: Arc::new(PartyService::new(db_pool.clone())),
            factories: Arc::new(FactoryService::new(db_pool.clone())),
            transactions: Arc::new(TransactionRecorder::new(db_pool.clone())),
            payments: Arc::new(PaymentRecorder::new(db_pool.clone())),
            summaries: Arc::new(SummaryService::new(db_pool.clone())),
            hisab: Arc::new(HisabService::new(db_pool)),
            gstin: Arc::new(GstinVerifier::new(gstin)?),
        })
    }
}
