//! Supabase (PostgREST) record store client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{Filter, Query, RecordStore, StoreError};

/// Read-only PostgREST client authenticated with the service key.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: Url,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(
        supabase_url: &str,
        service_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let service_key = service_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(StoreError::NotConfigured("SUPABASE_SERVICE_KEY is not defined"))?
            .to_string();

        let base_url = Url::parse(supabase_url)
            .map_err(|e| StoreError::Transport(format!("invalid SUPABASE_URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            service_key,
        })
    }

    /// Build the PostgREST URL for a query.
    pub fn query_url(&self, query: &Query) -> Result<Url, StoreError> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{}", query.table))
            .map_err(|e| StoreError::Transport(format!("invalid table {}: {}", query.table, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &query.columns);
            for filter in &query.filters {
                match filter {
                    Filter::Eq(column, value) => {
                        pairs.append_pair(column, &format!("eq.{}", value));
                    }
                }
            }
            if let Some((column, ascending)) = &query.order {
                let direction = if *ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", column, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn query(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let url = self.query_url(query)?;
        debug!(table = %query.table, url = %url, "store_query");

        let response = self
            .client
            .get(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                table = %query.table,
                status = status.as_u16(),
                "store_query_failed"
            );
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        debug!(table = %query.table, rows = rows.len(), "store_query_complete");

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(
            "https://project.supabase.co",
            Some("service-key"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_service_key() {
        let err = SupabaseStore::new("https://x.supabase.co", None, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::NotConfigured(_)));

        assert!(SupabaseStore::new("https://x.supabase.co", Some(" "), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert!(SupabaseStore::new("not a url", Some("k"), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_query_url() {
        let query = Query::table("brokers")
            .eq("slug", "acme")
            .eq("status", "published")
            .order("created_at", false)
            .limit(1);

        let url = store().query_url(&query).unwrap();

        assert_eq!(url.path(), "/rest/v1/brokers");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("slug".to_string(), "eq.acme".to_string()),
                ("status".to_string(), "eq.published".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }
}
