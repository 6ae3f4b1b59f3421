//! Integration tests for quotation persistence and the accepted-proposals
//! history query.

use std::sync::Arc;

use dealdesk::records::RecordService;
use dealdesk::store::{MemoryStore, QuotationStore};
use dealdesk::types::{ClientDetails, Identity, Quotation, Role};

fn owner(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: format!("{id}@clients.example"),
        role: Role::Client,
    }
}

fn service() -> RecordService {
    RecordService::new(Arc::new(MemoryStore::new()) as Arc<dyn QuotationStore>)
}

fn soap_details() -> ClientDetails {
    ClientDetails {
        client_name: "Ada Patel".to_string(),
        company_name: "Soapworks Ltd".to_string(),
        address: "12 Lather Lane".to_string(),
        phone_number: "555-0101".to_string(),
        email: "ada@soapworks.example".to_string(),
    }
}

#[tokio::test]
async fn persisted_quotation_round_trips() {
    let records = service();
    let user = owner("uid-1");
    let quotation = Quotation {
        raw_content: "Starter package: $500\n\nTotal: $500".to_string(),
    };

    let saved = records
        .save_quotation(&user, "We sell handmade soap", quotation.clone(), soap_details())
        .await
        .unwrap();

    let loaded = records.record(&saved.id).await.unwrap();
    assert_eq!(loaded.business, "We sell handmade soap");
    assert_eq!(loaded.quotation, quotation);
    assert_eq!(loaded.client_details, soap_details());
    assert_eq!(loaded.owner_id, "uid-1");
    assert!(!loaded.accepted);
    assert!(loaded.accepted_at.is_none());
    assert!(loaded.timestamp > 0);
}

#[tokio::test]
async fn accept_sets_flag_and_timestamp() {
    let records = service();
    let user = owner("uid-1");

    let saved = records
        .save_quotation(
            &user,
            "We sell handmade soap",
            Quotation {
                raw_content: "Total: $500".to_string(),
            },
            soap_details(),
        )
        .await
        .unwrap();

    records.accept(&saved.id).await.unwrap();

    let loaded = records.record(&saved.id).await.unwrap();
    assert!(loaded.accepted);
    assert!(loaded.accepted_at.unwrap() >= loaded.timestamp);
}

#[tokio::test]
async fn history_lists_only_the_owners_accepted_quotations() {
    let records = service();
    let ada = owner("uid-1");
    let noor = owner("uid-2");

    let accepted = records
        .save_quotation(
            &ada,
            "We sell handmade soap",
            Quotation {
                raw_content: "Total: $500".to_string(),
            },
            soap_details(),
        )
        .await
        .unwrap();
    records.accept(&accepted.id).await.unwrap();

    // Pending for the same owner; accepted for a different one.
    records
        .save_quotation(
            &ada,
            "We also sell candles",
            Quotation {
                raw_content: "Total: $900".to_string(),
            },
            soap_details(),
        )
        .await
        .unwrap();
    let other = records
        .save_quotation(
            &noor,
            "We run a bakery",
            Quotation {
                raw_content: "Total: $1200".to_string(),
            },
            ClientDetails::default(),
        )
        .await
        .unwrap();
    records.accept(&other.id).await.unwrap();

    let history = records.accepted_proposals(&ada).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, accepted.id);
    assert_eq!(history[0].business, "We sell handmade soap");
}

#[tokio::test]
async fn accepting_a_missing_record_fails() {
    let records = service();
    assert!(records.accept("no-such-id").await.is_err());
}
