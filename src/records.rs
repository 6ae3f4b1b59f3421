//! Quotation record store facade.
//!
//! Persists generated quotations for the signed-in user, flips them to
//! accepted, and answers the accepted-proposals history query.

use std::sync::Arc;

use crate::store::{QuotationDraft, QuotationStore, StoreError};
use crate::types::{ClientDetails, Identity, Quotation, QuotationRecord};

pub struct RecordService {
    store: Arc<dyn QuotationStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn QuotationStore>) -> Self {
        Self { store }
    }

    /// Persists a freshly generated quotation. The store assigns the id and
    /// creation timestamp.
    pub async fn save_quotation(
        &self,
        owner: &Identity,
        business: &str,
        quotation: Quotation,
        client_details: ClientDetails,
    ) -> Result<QuotationRecord, StoreError> {
        self.store
            .add(QuotationDraft {
                owner_id: owner.id.clone(),
                business: business.to_string(),
                quotation,
                client_details,
            })
            .await
    }

    pub async fn accept(&self, id: &str) -> Result<(), StoreError> {
        self.store.mark_accepted(id).await
    }

    pub async fn record(&self, id: &str) -> Result<QuotationRecord, StoreError> {
        self.store.record(id).await
    }

    /// Previously accepted proposals for the history list.
    pub async fn accepted_proposals(
        &self,
        owner: &Identity,
    ) -> Result<Vec<QuotationRecord>, StoreError> {
        self.store.accepted_for(&owner.id).await
    }
}
