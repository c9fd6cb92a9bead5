//! Broker reads against the record store.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::types::{sort_by_display_order, Broker, BrokerSummary, BrokerStatus};
use crate::store::{Query, RecordStore, StoreError};

pub const BROKERS_TABLE: &str = "brokers";

/// Fetch a published broker and all its child rows, children sorted by
/// `display_order`.
pub async fn fetch_published_broker(
    store: &dyn RecordStore,
    slug: &str,
) -> Result<Option<Broker>, StoreError> {
    let rows = store
        .query(
            &Query::table(BROKERS_TABLE)
                .eq("slug", slug)
                .eq("status", BrokerStatus::Published.as_str())
                .limit(1),
        )
        .await?;

    let row = match rows.into_iter().next() {
        Some(row) => row,
        None => {
            info!(slug = %slug, "broker_not_found");
            return Ok(None);
        }
    };

    let mut broker: Broker = decode(row)?;
    let id = broker.id.clone();

    broker.regulations = fetch_children(store, "broker_regulations", &id).await?;
    broker.accounts = fetch_children(store, "broker_accounts", &id).await?;
    broker.products = fetch_children(store, "broker_products", &id).await?;
    broker.payment_methods = fetch_children(store, "broker_payment_methods", &id).await?;
    broker.faqs = fetch_children(store, "broker_faqs", &id).await?;
    broker.pros_cons = fetch_children(store, "broker_pros_cons", &id).await?;
    broker.content_blocks = fetch_children(store, "broker_content_blocks", &id).await?;
    broker.schema_data = fetch_children(store, "broker_schema_data", &id).await?;

    sort_by_display_order(&mut broker.regulations);
    sort_by_display_order(&mut broker.accounts);
    sort_by_display_order(&mut broker.products);
    sort_by_display_order(&mut broker.payment_methods);
    sort_by_display_order(&mut broker.faqs);
    sort_by_display_order(&mut broker.pros_cons);
    sort_by_display_order(&mut broker.content_blocks);

    debug!(
        slug = %slug,
        broker_id = %id,
        regulations = broker.regulations.len(),
        faqs = broker.faqs.len(),
        "broker_fetched"
    );

    Ok(Some(broker))
}

/// Published brokers, newest first.
pub async fn list_published_brokers(
    store: &dyn RecordStore,
) -> Result<Vec<BrokerSummary>, StoreError> {
    let rows = store
        .query(
            &Query::table(BROKERS_TABLE)
                .select("slug,name,overall_rating,updated_at")
                .eq("status", BrokerStatus::Published.as_str())
                .order("created_at", false),
        )
        .await?;

    rows.into_iter().map(decode).collect()
}

/// Trivial read used by the health check.
pub async fn probe(store: &dyn RecordStore) -> Result<(), StoreError> {
    store
        .query(&Query::table(BROKERS_TABLE).select("id").limit(1))
        .await
        .map(|_| ())
}

async fn fetch_children<T: DeserializeOwned>(
    store: &dyn RecordStore,
    table: &str,
    broker_id: &str,
) -> Result<Vec<T>, StoreError> {
    let rows = store
        .query(&Query::table(table).eq("broker_id", broker_id))
        .await?;

    rows.into_iter().map(decode).collect()
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::MemoryStore;
    use serde_json::json;

    pub(crate) fn broker_row(id: &str, slug: &str, status: &str) -> Value {
        json!({
            "id": id,
            "slug": slug,
            "name": format!("{} Markets", slug),
            "meta_title": format!("{} review", slug),
            "meta_description": format!("Independent review of {}", slug),
            "overall_rating": 8.7,
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-03-01T00:00:00Z"
        })
    }

    pub(crate) fn sample_store() -> MemoryStore {
        MemoryStore::default()
            .with_rows(
                "brokers",
                vec![
                    broker_row("b1", "acme", "published"),
                    broker_row("b2", "hidden", "draft"),
                ],
            )
            .with_rows(
                "broker_faqs",
                vec![
                    json!({"id": "f2", "broker_id": "b1", "question": "Is it safe?", "answer": "Yes.", "display_order": 2}),
                    json!({"id": "f1", "broker_id": "b1", "question": "Min deposit?", "answer": "100 USD", "display_order": 1}),
                    json!({"id": "f3", "broker_id": "b2", "question": "Other", "answer": "No", "display_order": 0}),
                ],
            )
            .with_rows(
                "broker_regulations",
                vec![
                    json!({"id": "r2", "broker_id": "b1", "regulator_name": "ASIC", "display_order": 5}),
                    json!({"id": "r1", "broker_id": "b1", "regulator_name": "FCA", "license_number": "123456", "display_order": 1}),
                ],
            )
            .with_rows(
                "broker_pros_cons",
                vec![
                    json!({"id": "p1", "broker_id": "b1", "type": "pro", "content": "Low spreads", "display_order": 0}),
                    json!({"id": "p2", "broker_id": "b1", "type": "con", "content": "No crypto", "display_order": 1}),
                ],
            )
            .with_rows(
                "broker_content_blocks",
                vec![
                    json!({"id": "c2", "broker_id": "b1", "section_id": "fees", "block_type": "text", "title": "Fees", "content": "No inactivity fee.", "display_order": 2}),
                    json!({"id": "c1", "broker_id": "b1", "section_id": "intro", "block_type": "text", "content": "Acme launched in 2009.", "display_order": 1}),
                ],
            )
    }

    #[tokio::test]
    async fn test_fetch_published_broker_sorts_children() {
        let store = sample_store();
        let broker = fetch_published_broker(&store, "acme").await.unwrap().unwrap();

        assert_eq!(broker.id, "b1");
        let faq_ids: Vec<&str> = broker.faqs.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(faq_ids, vec!["f1", "f2"]);
        let block_ids: Vec<&str> = broker.content_blocks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(block_ids, vec!["c1", "c2"]);
        let regulators: Vec<&str> = broker
            .regulations
            .iter()
            .map(|r| r.regulator_name.as_str())
            .collect();
        assert_eq!(regulators, vec!["FCA", "ASIC"]);
        assert_eq!(broker.pros_cons.len(), 2);
        assert!(broker.accounts.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_skips_unpublished_broker() {
        let store = sample_store();
        assert!(fetch_published_broker(&store, "hidden").await.unwrap().is_none());
        assert!(fetch_published_broker(&store, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_published_brokers() {
        let store = sample_store();
        let brokers = list_published_brokers(&store).await.unwrap();
        assert_eq!(brokers.len(), 1);
        assert_eq!(brokers[0].slug, "acme");
    }

    #[tokio::test]
    async fn test_probe_reports_store_failure() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(probe(&store).await, Err(StoreError::Transport(_))));
        assert!(probe(&sample_store()).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_row_is_decode_error() {
        let store = MemoryStore::default()
            .with_rows("brokers", vec![json!({"id": "b1", "slug": "acme", "status": "published"})]);
        let err = fetch_published_broker(&store, "acme").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
