//! Install records from a Quip spreadsheet.
//!
//! The Quip thread API returns the document as HTML. The first table in it
//! is read as the install spreadsheet.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{InstallRecord, InstallSource};
use crate::error::{Error, Result};

const QUIP_SERVICE: &str = "Quip";

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    #[serde(default)]
    html: String,
}

/// Reads install records from a Quip thread.
#[derive(Debug, Clone)]
pub struct QuipSource {
    http: Client,
    base_url: String,
    token: String,
    thread_id: String,
}

impl QuipSource {
    /// Create a source for one thread.
    #[must_use]
    pub fn new(http: Client, base_url: &str, token: &str, thread_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            thread_id: thread_id.to_string(),
        }
    }

    fn thread_url(&self) -> String {
        format!("{}/1/threads/{}", self.base_url, self.thread_id)
    }
}

#[async_trait]
impl InstallSource for QuipSource {
    fn name(&self) -> &'static str {
        "quip"
    }

    async fn fetch(&self) -> Result<Vec<InstallRecord>> {
        let response = self
            .http
            .get(self.thread_url())
            .bearer_auth(&self.token)
            .send()
            .await?;
        response.error_for_status_ref()?;
        let thread: ThreadResponse = response.json().await?;

        let rows = parse_spreadsheet(&thread.html)?;
        debug!("Read {} rows from Quip thread {}", rows.len(), self.thread_id);
        Ok(rows.into_iter().map(InstallRecord::from_row).collect())
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<table\b[^>]*>(.*?)</table>")
}

fn thead_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<thead\b[^>]*>(.*?)</thead>")
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<tr\b[^>]*>(.*?)</tr>")
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]>")
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<[^>]*>")
}

fn column_letters_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^[A-Z]{1,3}$")
}

/// Parse the first HTML table into rows keyed by snake_case header names.
///
/// # Errors
///
/// Returns an API error if the document holds no table or no header row.
pub fn parse_spreadsheet(html: &str) -> Result<Vec<BTreeMap<String, String>>> {
    let table = table_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::api(QUIP_SERVICE, "thread contains no spreadsheet"))?
        .as_str();

    let (thead_cells, body) = match thead_re().captures(table) {
        Some(captures) => {
            let whole = captures.get(0).map_or(0..0, |m| m.range());
            let head = captures.get(1).map_or("", |m| m.as_str());
            let cells = rows(head).into_iter().next().unwrap_or_default();
            (Some(cells), &table[whole.end..])
        }
        None => (None, table),
    };

    let mut body_rows = rows(body).into_iter();
    let header = match thead_cells {
        Some(cells) if !is_column_letters(&cells) => cells,
        _ => body_rows
            .next()
            .ok_or_else(|| Error::api(QUIP_SERVICE, "spreadsheet has no header row"))?,
    };
    let header: Vec<String> = header.iter().map(|name| normalize_header(name)).collect();

    let records = body_rows
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .map(|cells| {
            header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| (name.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect();
    Ok(records)
}

fn rows(html: &str) -> Vec<Vec<String>> {
    row_re()
        .captures_iter(html)
        .filter_map(|row| row.get(1))
        .map(|row| {
            cell_re()
                .captures_iter(row.as_str())
                .filter_map(|cell| cell.get(1))
                .map(|cell| cell_text(cell.as_str()))
                .collect()
        })
        .collect()
}

fn cell_text(html: &str) -> String {
    let text = tag_re().replace_all(html, "");
    decode_entities(&text).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Spreadsheet column letters (A, B, … AA) rather than real header names.
fn is_column_letters(cells: &[String]) -> bool {
    let named: Vec<&String> = cells.iter().filter(|c| !c.is_empty()).collect();
    !named.is_empty() && named.iter().all(|c| column_letters_re().is_match(c))
}

fn normalize_header(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIP_SHEET: &str = r#"
        <h1>Install tracker</h1>
        <table id="sheet" title="Sheet1">
          <thead><tr><th id="x"><span>A</span></th><th><span>B</span></th>
            <th><span>C</span></th><th><span>D</span></th><th><span>E</span></th>
            <th><span>F</span></th></tr></thead>
          <tbody>
            <tr><td><span>Hostname</span></td><td><span>Device Type</span></td>
                <td><span>Physical Install Status</span></td>
                <td><span>IPv6 Admin Address</span></td>
                <td><span>Location Description</span></td>
                <td><span>Associated Link</span></td></tr>
            <tr><td><span>sec-1</span></td><td><span>Sector</span></td>
                <td><span>Installed</span></td><td><span>fd00::1</span></td>
                <td><span>Pole 1 &amp; North</span></td><td><span>Link A</span></td></tr>
            <tr><td><span>&nbsp;</span></td><td></td><td></td><td></td><td></td><td></td></tr>
            <tr><td><span>sec-2</span></td><td><span>Sector</span></td>
                <td><span>Planned</span></td><td></td>
                <td><span>Pole 2</span></td></tr>
          </tbody>
        </table>
        <table><tr><td>ignored</td></tr></table>
    "#;

    #[test]
    fn test_parse_quip_sheet_with_letter_header() {
        let rows = parse_spreadsheet(QUIP_SHEET).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["hostname"], "sec-1");
        assert_eq!(rows[0]["device_type"], "Sector");
        assert_eq!(rows[0]["ipv6_admin_address"], "fd00::1");
        assert_eq!(rows[0]["location_description"], "Pole 1 & North");
        // Short rows are padded with empty cells
        assert_eq!(rows[1]["associated_link"], "");
    }

    #[test]
    fn test_parse_named_thead() {
        let html = "<table><thead><tr><th>Hostname</th><th>Associated  Link</th></tr></thead>\
                    <tbody><tr><td>s1</td><td>L1</td></tr></tbody></table>";
        let rows = parse_spreadsheet(html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["associated_link"], "L1");
    }

    #[test]
    fn test_parse_without_thead() {
        let html = "<table><tr><td>hostname</td></tr><tr><td>s9</td></tr></table>";
        let rows = parse_spreadsheet(html).unwrap();
        assert_eq!(rows[0]["hostname"], "s9");
    }

    #[test]
    fn test_rows_become_records() {
        let records: Vec<InstallRecord> = parse_spreadsheet(QUIP_SHEET)
            .unwrap()
            .into_iter()
            .map(InstallRecord::from_row)
            .collect();
        assert!(records[0].is_installed_sector());
        assert!(!records[1].is_installed_sector());
    }

    #[test]
    fn test_no_table() {
        let err = parse_spreadsheet("<p>nothing here</p>").unwrap_err();
        assert!(err.to_string().contains("no spreadsheet"));
    }

    #[test]
    fn test_empty_table() {
        assert!(parse_spreadsheet("<table></table>").is_err());
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Physical Install\tStatus "), "physical_install_status");
    }

    #[test]
    fn test_column_letters() {
        let letters: Vec<String> = ["", "A", "B", "AA"].iter().map(ToString::to_string).collect();
        assert!(is_column_letters(&letters));
        let names: Vec<String> = ["Hostname", "B"].iter().map(ToString::to_string).collect();
        assert!(!is_column_letters(&names));
    }

    #[test]
    fn test_thread_url() {
        let source = QuipSource::new(Client::new(), "https://platform.quip.com/", "t", "AbC");
        assert_eq!(source.thread_url(), "https://platform.quip.com/1/threads/AbC");
        assert_eq!(source.name(), "quip");
    }

    #[tokio::test]
    async fn test_fetch_thread() {
        let server = crate::http::stub::StubServer::bind().await;
        let source = QuipSource::new(Client::new(), server.url(), "secret", "AbC");
        let requests = server.serve(vec![(
            200,
            serde_json::json!({ "html": QUIP_SHEET }).to_string(),
        )]);

        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hostname, "sec-1");
        assert_eq!(records[0].associated_link, "Link A");

        let requests = requests.await.unwrap();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].target, "/1/threads/AbC");
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn test_fetch_thread_unauthorized() {
        let server = crate::http::stub::StubServer::bind().await;
        let source = QuipSource::new(Client::new(), server.url(), "bad", "AbC");
        let _requests = server.serve(vec![(401, r#"{"error": "bad token"}"#.to_string())]);

        let err = source.fetch().await.unwrap_err();
        assert!(err.is_remote());
    }
}
