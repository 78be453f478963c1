//! GitHub gist access for sharing a feature collection.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::GithubConfig;
use crate::error::{Error, Result};

const GITHUB_SERVICE: &str = "GitHub";
const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct GistResponse {
    #[serde(default)]
    files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// Reads and updates gists through the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GistClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GistClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(http: Client, config: &GithubConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn gist_url(&self, gist_id: &str) -> String {
        format!("{}/gists/{gist_id}", self.api_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, ACCEPT);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the GeoJSON text stored in a gist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gist holds no files.
    pub async fn fetch_collection(&self, gist_id: &str) -> Result<String> {
        let response = self
            .authorize(self.http.get(self.gist_url(gist_id)))
            .send()
            .await?;
        response.error_for_status_ref()?;
        let gist: GistResponse = response.json().await?;

        let file = select_file(&gist.files)
            .cloned()
            .ok_or_else(|| Error::api(GITHUB_SERVICE, format!("gist {gist_id} has no files")))?;

        match (file.truncated, file.content, file.raw_url) {
            (false, Some(content), _) => Ok(content),
            (_, _, Some(raw_url)) => {
                debug!("Fetching full gist content from {raw_url}");
                let response = self.authorize(self.http.get(raw_url)).send().await?;
                response.error_for_status_ref()?;
                Ok(response.text().await?)
            }
            _ => Err(Error::api(
                GITHUB_SERVICE,
                format!("gist {gist_id} file has no content"),
            )),
        }
    }

    /// Replace (or create) one file in a gist.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is configured or the request fails.
    pub async fn update_file(&self, gist_id: &str, file_name: &str, content: &str) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::MissingSetting {
                name: "github.token",
            });
        }
        let mut files = serde_json::Map::new();
        files.insert(file_name.to_string(), json!({ "content": content }));
        let body = json!({ "files": files });
        let response = self
            .authorize(self.http.patch(self.gist_url(gist_id)))
            .json(&body)
            .send()
            .await?;
        response.error_for_status_ref()?;
        Ok(())
    }
}

/// Pick the GeoJSON file of a gist: the first `.geojson`/`.json` file, or
/// the last file when none is named that way.
fn select_file(files: &BTreeMap<String, GistFile>) -> Option<&GistFile> {
    files
        .iter()
        .find(|(name, _)| {
            let name = name.to_ascii_lowercase();
            name.ends_with(".geojson") || name.ends_with(".json")
        })
        .or_else(|| files.iter().next_back())
        .map(|(_, file)| file)
}
