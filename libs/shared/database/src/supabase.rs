use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::query::Query;
use crate::store::RowStore;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.database_key().to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            query: &[(String, String)],
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, query, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         query: &[(String, String)],
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {} with {} filters", method, url, query.len());

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers)
            .query(query);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Constraint violation: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn table_path(table: &str) -> String {
        format!("/rest/v1/{}", table)
    }
}

#[async_trait]
impl RowStore for SupabaseClient {
    async fn insert_row(&self, table: &'static str, row: Value) -> Result<Value> {
        let result: Vec<Value> = self.request_with_headers(
            Method::POST,
            &Self::table_path(table),
            &[],
            Some(&self.service_key),
            Some(row),
            Some(Self::representation_headers()),
        ).await?;

        result.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert into {} returned no row", table))
    }

    async fn update_rows(&self, query: &Query, fields: Value) -> Result<Vec<Value>> {
        if query.filters().is_empty() {
            return Err(anyhow!("Refusing unfiltered update on {}", query.table_name()));
        }

        self.request_with_headers(
            Method::PATCH,
            &Self::table_path(query.table_name()),
            &query.to_query_pairs(),
            Some(&self.service_key),
            Some(fields),
            Some(Self::representation_headers()),
        ).await
    }

    async fn select_rows(&self, query: &Query) -> Result<Vec<Value>> {
        self.request(
            Method::GET,
            &Self::table_path(query.table_name()),
            &query.to_query_pairs(),
            Some(&self.service_key),
            None,
        ).await
    }

    async fn delete_rows(&self, query: &Query) -> Result<usize> {
        if query.filters().is_empty() {
            return Err(anyhow!("Refusing unfiltered delete on {}", query.table_name()));
        }

        let deleted: Vec<Value> = self.request_with_headers(
            Method::DELETE,
            &Self::table_path(query.table_name()),
            &query.to_query_pairs(),
            Some(&self.service_key),
            None,
            Some(Self::representation_headers()),
        ).await?;

        Ok(deleted.len())
    }
}
