//! PostgREST client for hosted Postgres tables

use anyhow::anyhow;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;
use ureq::Agent;

use super::{DataSource, Query, Record};
use crate::config::BackendConfig;
use crate::error::QueryFailure;

/// Characters escaped in query-string names and values
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Read-only client for `{url}/rest/v1/{table}`
pub struct PostgrestSource {
    agent: Agent,
    base_url: String,
    api_key: Option<String>,
}

impl PostgrestSource {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    /// Client for the configured backend; the service-role key is preferred
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("backend.url (or SUPABASE_URL) is required for the postgrest backend"))?;
        if config.api_key().is_none() {
            tracing::warn!("No API key configured for {}; requests are anonymous", url);
        }
        Ok(Self::new(
            url,
            config.api_key().map(str::to_string),
            config.timeout(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request URL for a query
    fn request_url(&self, table: &str, query: &Query) -> String {
        let encode = |s: &str| utf8_percent_encode(s, QUERY_VALUE).to_string();
        let mut params = vec!["select=*".to_string()];

        for filter in &query.filters {
            params.push(format!(
                "{}={}.{}",
                encode(&filter.column),
                filter.op,
                encode(&filter.value)
            ));
        }
        if let Some(order) = &query.order_by {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(format!("order={}.{}", encode(&order.column), direction));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={}", limit));
        }

        format!(
            "{}/rest/v1/{}?{}",
            self.base_url,
            encode(table),
            params.join("&")
        )
    }
}

impl DataSource for PostgrestSource {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, QueryFailure> {
        let url = self.request_url(table, query);
        tracing::debug!("GET {}", url);

        let mut request = self.agent.get(&url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", &format!("Bearer {}", key));
        }

        let response = request.call()?;
        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(QueryFailure::Response { status, body });
        }

        Ok(body.read_json()?)
    }
}
