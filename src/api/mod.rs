//! Async HTTP client for the dependency service.
//!
//! - [`upload`]: submit normalized source units as a custom build.
//! - [`revisions`]: fetch revision records (licenses, project metadata) by
//!   locator.

pub mod revisions;
pub mod upload;

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder};

const USER_AGENT: &str = concat!("deplocatr/", env!("CARGO_PKG_VERSION"));

pub struct ApiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.authorize(self.client.post(url))
    }
}
