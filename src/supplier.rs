//! 外部連携（商社API・データシート取得）
//!
//! コアからは trait 越しに使う。テストでは差し替える。

use crate::error::{CatalogError, Result};
use parts_catalog_common::{first_mouser_part, mouser_part_attributes, AttributeMap};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// 部品番号から属性を引く外部ルックアップ
pub trait SupplierLookup {
    /// 見つからなければ `Ok(None)`
    fn lookup(
        &self,
        part_number: &str,
        credential: &str,
    ) -> impl Future<Output = Result<Option<AttributeMap>>> + Send;
}

/// URLからバイト列を取得
pub trait ByteFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
        .build()
        .map_err(CatalogError::from)
}

/// Mouser 部品番号検索API
#[derive(Debug, Clone)]
pub struct MouserClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MouserClient {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.mouser.com/api/v1/search/partnumber";

    pub fn new() -> Result<Self> {
        Self::with_endpoint(Self::DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.into(),
        })
    }

    fn request_body(part_number: &str) -> Value {
        json!({
            "SearchByPartRequest": {
                "mouserPartNumber": part_number,
                "partSearchOptions": "Exact"
            }
        })
    }
}

impl SupplierLookup for MouserClient {
    async fn lookup(&self, part_number: &str, credential: &str) -> Result<Option<AttributeMap>> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("apiKey", credential)])
            .json(&Self::request_body(part_number))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http(format!("Mouser API returned HTTP {}", status)));
        }

        let json: Value = response.json().await?;
        Ok(first_mouser_part(&json).map(mouser_part_attributes))
    }
}

/// HTTP GET でデータシートを取得
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http(format!("{}: HTTP {}", url, status)));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = MouserClient::request_body("RC0603FR-0710KL");
        assert_eq!(body["SearchByPartRequest"]["mouserPartNumber"], "RC0603FR-0710KL");
        assert_eq!(body["SearchByPartRequest"]["partSearchOptions"], "Exact");
    }
}
