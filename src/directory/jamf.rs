//! Jamf Pro Classic API client for network segments.
//!
//! Reads use JSON (`Accept: application/json`), writes send XML bodies, the
//! only format the Classic API accepts for them.

use super::{CreateOutcome, DirectoryClient};
use crate::error::DirectoryError;
use crate::models::{Record, RemoteSegment, SegmentId};
use async_trait::async_trait;
use colored::Colorize;
use regex::Regex;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

const SEGMENTS_PATH: &str = "networksegments";

/// Connection settings for the Jamf server.
#[derive(Debug, Clone)]
pub struct JamfConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl JamfConfig {
    /// `https://server:port/JSSResource`, unless `server` already carries a scheme.
    pub fn base_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            format!("{server}/JSSResource")
        } else {
            format!("https://{server}:{port}/JSSResource", port = self.port)
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
struct SegmentSummary {
    id: SegmentId,
    name: String,
}

#[derive(Deserialize, Debug)]
struct SegmentList {
    network_segments: Vec<SegmentSummary>,
}

#[derive(Deserialize, Debug)]
struct SegmentDetail {
    network_segment: RemoteSegment,
}

/// Ids by name, from one listing of the server.
///
/// Looking a segment up by name needs the full listing, because the name
/// endpoint silently picks one of several same-named segments. The listing
/// is fetched on the first collision and then kept current with this
/// client's own creates and deletes, so a run lists once instead of once
/// per collision.
#[derive(Debug)]
struct SegmentIndex {
    entries: Vec<SegmentSummary>,
}

impl SegmentIndex {
    fn new(entries: Vec<SegmentSummary>) -> Self {
        SegmentIndex { entries }
    }

    fn lookup(&self, name: &str) -> Result<SegmentId, DirectoryError> {
        let ids: Vec<SegmentId> = self
            .entries
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.id)
            .collect();
        match ids.as_slice() {
            [] => Err(DirectoryError::NotFound {
                name: name.to_string(),
            }),
            [id] => Ok(*id),
            many => Err(DirectoryError::Ambiguous {
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }

    fn add(&mut self, id: SegmentId, name: &str) {
        self.entries.push(SegmentSummary {
            id,
            name: name.to_string(),
        });
    }

    fn remove(&mut self, id: SegmentId) {
        self.entries.retain(|s| s.id != id);
    }
}

pub struct JamfClient {
    http: reqwest::Client,
    config: JamfConfig,
    base_url: String,
    index: Mutex<Option<SegmentIndex>>,
}

impl JamfClient {
    pub fn new(config: JamfConfig) -> Result<JamfClient, DirectoryError> {
        if !config.verify_tls {
            log::warn!("TLS certificate verification is {}", "disabled".on_red());
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        let base_url = config.base_url();
        log::info!("Using directory {base_url} as user {}", config.user);
        Ok(JamfClient {
            http,
            config,
            base_url,
            index: Mutex::new(None),
        })
    }

    fn index(&self) -> MutexGuard<'_, Option<SegmentIndex>> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Id of the only segment called `name`.
    ///
    /// A name missing from the kept listing triggers one fresh listing, since
    /// the segment may have been added on the server after it was taken.
    async fn lookup_id(&self, name: &str) -> Result<SegmentId, DirectoryError> {
        let cached = {
            let guard = self.index();
            guard.as_ref().map(|index| index.lookup(name))
        };
        match cached {
            Some(Err(DirectoryError::NotFound { .. })) | None => {}
            Some(found) => return found,
        }
        log::debug!("Listing segments to look up '{name}'");
        let index = SegmentIndex::new(self.list_summaries().await?);
        let found = index.lookup(name);
        *self.index() = Some(index);
        found
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and return the status and body text.
    async fn send(
        &self,
        method: Method,
        path: &str,
        xml_body: Option<String>,
    ) -> Result<(StatusCode, String), DirectoryError> {
        let url = self.url(path);
        log::debug!("{method} {url}", url = url.on_blue());

        let mut request = self
            .http
            .request(method.clone(), &url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = xml_body {
            log::trace!("request body: {body}");
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/xml")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        log::debug!("{method} {path} -> {status} ({} bytes)", text.len());
        Ok((status, text))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let (status, text) = self.send(Method::GET, path, None).await?;
        if !status.is_success() {
            return Err(rejected(status, &text));
        }
        decode(&text)
    }

    async fn list_summaries(&self) -> Result<Vec<SegmentSummary>, DirectoryError> {
        let list: SegmentList = self.get_json(SEGMENTS_PATH).await?;
        Ok(list.network_segments)
    }

    async fn write(&self, method: Method, path: &str, body: String) -> Result<String, DirectoryError> {
        let (status, text) = self.send(method, path, Some(body)).await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(rejected(status, &text))
        }
    }
}

#[async_trait]
impl DirectoryClient for JamfClient {
    async fn create(&self, record: &Record) -> Result<CreateOutcome, DirectoryError> {
        let ending = record.ending_address()?;
        let body = segment_xml(&record.name, &record.starting, &ending);
        let path = format!("{SEGMENTS_PATH}/id/0");

        let (status, text) = self.send(Method::POST, &path, Some(body)).await?;
        if status == StatusCode::CONFLICT && is_duplicate_name(&text) {
            log::debug!("'{}' already exists", record.name);
            return Ok(CreateOutcome::Collided);
        }
        if !status.is_success() {
            return Err(rejected(status, &text));
        }

        let id = created_id(&text).ok_or_else(|| DirectoryError::Decode {
            message: format!("no id in create response: {}", error_message(&text)),
        })?;
        if let Some(index) = self.index().as_mut() {
            index.add(id, &record.name);
        }
        Ok(CreateOutcome::Created(RemoteSegment {
            id,
            name: record.name.clone(),
            starting_address: record.starting.clone(),
            ending_address: ending,
        }))
    }

    async fn find_by_name(&self, name: &str) -> Result<RemoteSegment, DirectoryError> {
        let id = self.lookup_id(name).await?;
        let detail: SegmentDetail = self.get_json(&format!("{SEGMENTS_PATH}/id/{id}")).await?;
        Ok(detail.network_segment)
    }

    async fn update(&self, segment: &RemoteSegment) -> Result<(), DirectoryError> {
        let body = segment_xml(
            &segment.name,
            &segment.starting_address,
            &segment.ending_address,
        );
        self.write(Method::PUT, &format!("{SEGMENTS_PATH}/id/{}", segment.id), body)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: SegmentId) -> Result<(), DirectoryError> {
        let (status, text) = self
            .send(Method::DELETE, &format!("{SEGMENTS_PATH}/id/{id}"), None)
            .await?;
        if !status.is_success() {
            return Err(rejected(status, &text));
        }
        if let Some(index) = self.index().as_mut() {
            index.remove(id);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<BTreeMap<SegmentId, String>, DirectoryError> {
        let summaries = self.list_summaries().await?;
        log::info!("Directory holds {} network segments", summaries.len());
        let all = summaries.iter().map(|s| (s.id, s.name.clone())).collect();
        *self.index() = Some(SegmentIndex::new(summaries));
        Ok(all)
    }
}

/// Decode a JSON body, reporting the path of the offending field.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DirectoryError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        log::debug!("BODY START:\n{text}\nBODY END");
        DirectoryError::Decode {
            message: format!("path={} error={}", e.path(), e),
        }
    })
}

fn rejected(status: StatusCode, body: &str) -> DirectoryError {
    DirectoryError::Rejected {
        status: status.as_u16(),
        message: error_message(body),
    }
}

pub(crate) fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn segment_xml(name: &str, starting: &str, ending: &str) -> String {
    format!(
        "<network_segment><name>{}</name><starting_address>{}</starting_address><ending_address>{}</ending_address></network_segment>",
        xml_escape(name),
        xml_escape(starting),
        xml_escape(ending)
    )
}

static ID_REGEX: OnceLock<Regex> = OnceLock::new();
static ERROR_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Id from a `<network_segment><id>12</id></network_segment>` create response.
fn created_id(body: &str) -> Option<SegmentId> {
    let re = ID_REGEX.get_or_init(|| Regex::new(r"<id>\s*(\d+)\s*</id>").expect("Invalid Regex"));
    re.captures(body)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
        .map(SegmentId)
}

/// Human-readable message from an HTML or XML error page.
fn error_message(body: &str) -> String {
    let error_re = ERROR_REGEX
        .get_or_init(|| Regex::new(r"(?is)<p>\s*(?:Error:\s*)?(.*?)\s*</p>").expect("Invalid Regex"));
    if let Some(found) = error_re.captures(body).and_then(|c| c.get(1)) {
        return found.as_str().to_string();
    }
    let tag_re = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid Regex"));
    let text = tag_re.replace_all(body, " ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.len() > 200 {
        let mut cut = 200;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &text[..cut])
    } else {
        text
    }
}

fn is_duplicate_name(body: &str) -> bool {
    let message = error_message(body).to_ascii_lowercase();
    message.contains("duplicate") || message.contains("already")
}
