use anyhow::Result;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::locator::Locator;
use crate::ui::Ui;

/// Requests in flight at once.
const BATCH_SIZE: usize = 75;

/// What the service knows about one package revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub locator: String,
    #[serde(default)]
    pub licenses: Vec<License>,
    #[serde(default)]
    pub project: Option<Project>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub license_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl ApiClient {
    /// Fetch revision records for `locators`. Locators the service does not
    /// know are left out.
    pub async fn revisions(&self, locators: &[Locator], ui: &Ui) -> Result<Vec<Revision>> {
        let pb = ui.progress(locators.len());
        let mut found = Vec::new();

        for batch in locators.chunks(BATCH_SIZE) {
            let results = join_all(batch.iter().map(|locator| self.revision(locator))).await;
            for (locator, result) in batch.iter().zip(results) {
                match result? {
                    Some(rev) => found.push(rev),
                    None => ui.debug(format!("No revision found for {locator}")),
                }
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(found)
    }

    /// Fetch revision records one request at a time. A failed lookup is
    /// reported and skipped instead of failing the whole report.
    pub async fn revisions_each(&self, locators: &[Locator], ui: &Ui) -> Vec<Revision> {
        let pb = ui.progress(locators.len());
        let mut found = Vec::new();

        for locator in locators {
            match self.revision(locator).await {
                Ok(Some(rev)) => found.push(rev),
                Ok(None) => ui.debug(format!("No revision found for {locator}")),
                Err(err) => ui.warn(format!("Could not fetch revision for {locator}: {err:#}")),
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        found
    }

    async fn revision(&self, locator: &Locator) -> Result<Option<Revision>> {
        let response = self.get(&revision_url(&self.endpoint, locator)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let rev = response.error_for_status()?.json().await?;
        Ok(Some(rev))
    }
}

/// The locator is sent as one path segment in its query-string form.
pub fn revision_url(endpoint: &str, locator: &Locator) -> String {
    format!(
        "{}/api/revisions/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(&locator.query_string())
    )
}
