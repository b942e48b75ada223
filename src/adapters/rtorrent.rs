//! rTorrent XML-RPC adapter.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use url::Url;

use super::xmlrpc::{self, Value};
use super::{base_url, http_client, ClientError, TorrentClient};
use crate::config::Timeouts;
use crate::core::RetryPolicy;

/// Method whose presence marks a usable rTorrent instance
pub const ERASE_METHOD: &str = "d.erase";

/// rTorrent XML-RPC client
pub struct RTorrentClient {
    endpoint: Url,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl RTorrentClient {
    /// Create a client for an XML-RPC endpoint such as `http://host/RPC2`
    pub fn new(host: &str, timeouts: &Timeouts) -> Result<Self, ClientError> {
        let invalid = |source| ClientError::InvalidUrl {
            url: host.to_string(),
            source,
        };
        let mut endpoint = base_url(host).map_err(invalid)?;
        if endpoint.path() != "/" {
            let path = endpoint.path().trim_end_matches('/').to_string();
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            client: http_client(timeouts).build()?,
            retry: RetryPolicy::default(),
        })
    }

    /// Override the per-torrent removal retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, ClientError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(xmlrpc::method_call(method, params))
            .send()
            .await?;
        let response = ClientError::check(response).await?;

        let body = response.text().await?;
        Ok(xmlrpc::parse_response(&body)?)
    }

    /// Methods exposed by the server
    pub async fn list_methods(&self) -> Result<Vec<String>, ClientError> {
        let methods = self.call("system.listMethods", &[]).await?;
        let methods = methods.as_array().ok_or_else(|| {
            ClientError::Rpc("system.listMethods did not return an array".to_string())
        })?;

        Ok(methods
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Tag, delete the data of, and erase one torrent in a single multicall
    async fn erase(&self, hash: &str) -> Result<(), ClientError> {
        let step = |method: &str, params: Vec<Value>| {
            Value::structure([
                ("methodName", Value::from(method)),
                ("params", Value::from(params)),
            ])
        };
        let calls = Value::from(vec![
            step("d.custom5.set", vec![Value::from(hash), Value::from("1")]),
            step("d.delete_tied", vec![Value::from(hash)]),
            step(ERASE_METHOD, vec![Value::from(hash)]),
        ]);

        let response = self.call("system.multicall", &[calls]).await?;
        let results = response.as_array().ok_or_else(|| {
            ClientError::Rpc(format!("unexpected multicall response: {:?}", response))
        })?;

        let faults: Vec<&Value> = results
            .iter()
            .filter(|r| matches!(r, Value::Struct(_)))
            .collect();
        if !faults.is_empty() {
            return Err(ClientError::Rpc(format!("multicall faults: {:?}", faults)));
        }
        if !results.iter().any(|r| matches!(r, Value::Array(_))) {
            return Err(ClientError::Rpc("multicall returned no results".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TorrentClient for RTorrentClient {
    fn name(&self) -> &str {
        "rtorrent"
    }

    async fn test(&self) -> Result<(), ClientError> {
        let methods = self.list_methods().await?;
        if !methods.iter().any(|m| m == ERASE_METHOD) {
            return Err(ClientError::Unsupported(format!(
                "rTorrent does not expose {}",
                ERASE_METHOD
            )));
        }

        info!("Successfully connected to rTorrent");
        Ok(())
    }

    async fn remove_torrents(&self, hashes: &[String]) -> Result<(), ClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        info!(hashes = ?hashes, "Requesting torrent removal");

        for hash in hashes {
            let mut attempt = 0;
            loop {
                attempt += 1;
                match self.erase(hash).await {
                    Ok(()) => {
                        info!(hash = %hash, attempt, "Torrent has been removed");
                        break;
                    }
                    Err(e) if self.retry.should_retry(attempt) => {
                        let delay = self.retry.delay();
                        warn!(
                            hash = %hash,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Torrent removal failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        error!(hash = %hash, attempt, error = %e, "Couldn't remove torrent");
                        break;
                    }
                }
            }
        }

        debug!(count = hashes.len(), "rTorrent removal pass finished");
        Ok(())
    }
}
