//! API du portail data.taipei
//!
//! Les enregistrements sont paginés par 1000 ; le nombre total est donné
//! par `result.count` de la première page.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value as Json};
use tracing::{info, warn};

use super::http::HttpFetcher;
use crate::error::FetchError;
use crate::time::parse_timestamp;

const PAGE_SIZE: usize = 1000;
const API_BASE: &str = "https://data.taipei/api";
const CHANGE_MARKER: &str = "更新於";

/// Enregistrement brut, clés telles que publiées
pub type Record = Map<String, Json>;

/// Accès à l'API data.taipei
pub struct DataTaipei<'a> {
    http: &'a HttpFetcher,
    base: String,
}

impl<'a> DataTaipei<'a> {
    pub fn new(http: &'a HttpFetcher) -> Self {
        Self::with_base(http, API_BASE)
    }

    pub fn with_base(http: &'a HttpFetcher, base: &str) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn page_url(&self, rid: &str, page: usize) -> String {
        format!(
            "{}/v1/dataset/{}?scope=resourceAquire&offset={}&limit={}",
            self.base,
            rid,
            page * PAGE_SIZE,
            PAGE_SIZE
        )
    }

    /// Parcourt toutes les pages d'une ressource
    pub async fn fetch_dataset(&self, rid: &str) -> Result<Vec<Record>, FetchError> {
        let url = self.page_url(rid, 0);
        let first: Json = self.http.get_json(&url).await?;
        let (count, mut records) = parse_page(&url, &first)?;

        let pages = page_count(count);
        for page in 1..pages {
            let url = self.page_url(rid, page);
            let body: Json = self.http.get_json(&url).await?;
            let (_, rows) = parse_page(&url, &body)?;
            records.extend(rows);
        }

        info!(rid = %rid, count, pages, records = records.len(), "data.taipei dataset fetched");
        Ok(records)
    }

    /// Date de dernière modification d'un fichier d'un jeu de données
    pub async fn file_last_modified(&self, page_id: &str, rank: usize) -> Result<String, FetchError> {
        let url = format!("{}/frontstage/tpeod/dataset.view?id={}", self.base, page_id);
        let body: Json = self.http.get_json(&url).await?;
        body.pointer(&format!("/payload/resources/{rank}/last_modified"))
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::payload(&url, "missing last_modified"))
    }

    /// Date de mise à jour lue dans l'historique des changements
    pub async fn page_change_time(&self, page_id: &str, rank: usize) -> Result<String, FetchError> {
        let url = format!(
            "{}/frontstage/tpeod/dataset/change-history.list?id={}",
            self.base, page_id
        );
        let body: Json = self.http.get_json(&url).await?;
        let entry = body
            .pointer(&format!("/payload/{rank}"))
            .and_then(Json::as_str)
            .ok_or_else(|| FetchError::payload(&url, "missing change history entry"))?;
        extract_change_time(entry).ok_or_else(|| FetchError::payload(&url, "no change time"))
    }

    /// Date des données publiées
    ///
    /// Dernière modification du fichier, sinon date lue dans l'historique
    /// des changements. Une erreur réseau ou de statut reste fatale ; une
    /// date absente ou illisible donne `None`.
    pub async fn data_time(
        &self,
        page_id: &str,
        rank: usize,
    ) -> Result<Option<DateTime<FixedOffset>>, FetchError> {
        match self.file_last_modified(page_id, rank).await {
            Ok(raw) => match parse_timestamp(&raw) {
                Some(time) => return Ok(Some(time)),
                None => warn!(value = %raw, "Unparsable file modification time"),
            },
            Err(e @ FetchError::Payload { .. }) => warn!(error = %e, "No file modification time"),
            Err(e) => return Err(e),
        }

        match self.page_change_time(page_id, rank).await {
            Ok(raw) => {
                let time = parse_timestamp(&raw);
                if time.is_none() {
                    warn!(value = %raw, "Unparsable change time");
                }
                Ok(time)
            }
            Err(e @ FetchError::Payload { .. }) => {
                warn!(error = %e, "No change time, data_time left empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Nombre de pages pour `count` enregistrements
pub fn page_count(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE).max(1)
}

/// Extrait `(result.count, result.results)` d'une page
pub fn parse_page(url: &str, body: &Json) -> Result<(usize, Vec<Record>), FetchError> {
    let result = body
        .get("result")
        .ok_or_else(|| FetchError::payload(url, "missing result"))?;
    let count = result
        .get("count")
        .and_then(Json::as_u64)
        .ok_or_else(|| FetchError::payload(url, "missing result.count"))? as usize;
    let records = result
        .get("results")
        .and_then(Json::as_array)
        .ok_or_else(|| FetchError::payload(url, "missing result.results"))?
        .iter()
        .filter_map(|r| r.as_object().cloned())
        .collect();
    Ok((count, records))
}

/// Texte qui suit le dernier marqueur de mise à jour
pub fn extract_change_time(entry: &str) -> Option<String> {
    if !entry.contains(CHANGE_MARKER) {
        return None;
    }
    let tail = entry.rsplit(CHANGE_MARKER).next()?.trim();
    (!tail.is_empty()).then(|| tail.to_string())
}
