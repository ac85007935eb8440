use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::ApiClient;
use crate::config::Settings;
use crate::locator::Locator;
use crate::normalize::SourceUnit;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    locator: String,
}

impl ApiClient {
    /// Upload source units as a custom build of the configured project and
    /// return the locator the service assigned to it.
    pub async fn upload(&self, settings: &Settings, units: &[SourceUnit]) -> Result<Locator> {
        if settings.project.is_empty() {
            bail!("could not infer a project name (set --project or [project] name)");
        }
        if settings.revision.is_empty() {
            bail!("could not infer a revision (set --revision or [project] revision)");
        }

        let url = format!("{}/api/builds/custom", self.endpoint);
        let response = self
            .post(&url)
            .query(&upload_query(settings))
            .json(units)
            .send()
            .await?
            .error_for_status()
            .context("upload rejected by the service")?;

        let body: UploadResponse = response.json().await?;
        Ok(body.locator.parse()?)
    }
}

/// Query parameters identifying the build being uploaded.
pub fn upload_query(settings: &Settings) -> Vec<(&'static str, String)> {
    let locator = Locator::new(&settings.fetcher, &settings.project, &settings.revision);
    let mut query = vec![
        ("locator", locator.query_string()),
        ("v", env!("CARGO_PKG_VERSION").to_string()),
        ("managedBuild", "true".to_string()),
    ];
    if !settings.title.is_empty() {
        query.push(("title", settings.title.clone()));
    }
    if !settings.branch.is_empty() {
        query.push(("branch", settings.branch.clone()));
    }
    query
}

/// Where the service shows the uploaded build.
pub fn report_url(endpoint: &str, locator: &Locator, branch: &str) -> String {
    let project = format!("{}+{}", locator.fetcher(), locator.project());
    format!(
        "{}/projects/{}/refs/branch/{}/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(&project),
        urlencoding::encode(branch),
        urlencoding::encode(locator.revision()),
    )
}
