// Snapshot sources: where the poller gets its data from.
// HttpSource talks to the cluster master's REST endpoints via reqwest.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::models::wire::{self, ItemList};
use crate::models::{Category, ClusterStat, JobDetails, Snapshot, WorkerNode};

/// Fetches the latest snapshot for a category, or the cluster samples of the last
/// `seconds_since` seconds.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(&self, category: Category)
    -> impl Future<Output = Result<Snapshot, FetchError>> + Send;

    fn fetch_cluster(
        &self,
        seconds_since: u64,
    ) -> impl Future<Output = Result<Vec<ClusterStat>, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
    jobs_path: String,
    nodes_path: String,
    cluster_path: String,
    since_param: String,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            jobs_path: config.jobs_path.clone(),
            nodes_path: config.nodes_path.clone(),
            cluster_path: config.cluster_path.clone(),
            since_param: config.since_param.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl SnapshotSource for HttpSource {
    #[instrument(skip(self), fields(source = "http"))]
    async fn fetch(&self, category: Category) -> Result<Snapshot, FetchError> {
        match category {
            Category::Jobs => {
                let url = self.url(&self.jobs_path);
                let list: ItemList<JobDetails> = self.get_json(&url, &[]).await?;
                Ok(wire::jobs_snapshot(&list))
            }
            Category::Nodes => {
                let url = self.url(&self.nodes_path);
                let list: ItemList<WorkerNode> = self.get_json(&url, &[]).await?;
                Ok(wire::nodes_snapshot(&list))
            }
        }
    }

    #[instrument(skip(self), fields(source = "http"))]
    async fn fetch_cluster(&self, seconds_since: u64) -> Result<Vec<ClusterStat>, FetchError> {
        let url = self.url(&self.cluster_path);
        let list: ItemList<ClusterStat> = self
            .get_json(&url, &[(self.since_param.as_str(), seconds_since.to_string())])
            .await?;
        Ok(list.items)
    }
}
