//! Erreurs du pipeline, une famille par étape (configuration, extraction,
//! transformation, chargement)

use std::path::PathBuf;

use citygeo::{CityGeoError, GeometryType};
use thiserror::Error;

/// Erreur de configuration, détectée avant toute écriture
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown load behavior: {0} (use: append, replace, current+history)")]
    UnknownLoadBehavior(String),

    #[error("history_table is required when load_behavior is current+history")]
    MissingHistoryTable,

    #[error("history_table must differ from default_table ({0})")]
    SameHistoryTable(String),

    #[error("Invalid table identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Invalid geometry_type: {0}")]
    InvalidGeometryType(String),

    #[error("geometry_type is required on the geometry-aware save")]
    MissingGeometryType,

    #[error("Dataset carries geometry column {0}; use the geometry-aware save")]
    GeometryOnPlainPath(String),

    #[error("Geometry column {0} not found in dataset")]
    MissingGeometryColumn(String),

    #[error("Column {column} is {kind}, expected a canonical geometry")]
    NotCanonical { column: String, kind: String },

    #[error("Column {column} is declared {found}, expected {expected}")]
    ColumnTypeMismatch {
        column: String,
        expected: GeometryType,
        found: GeometryType,
    },

    #[error("Row {row}: geometry {found} does not match declared {expected}")]
    GeometryTypeMismatch {
        row: usize,
        expected: GeometryType,
        found: GeometryType,
    },

    #[error("Row {row}: geometry SRID {srid} differs from {expected}")]
    SridMismatch { row: usize, srid: u32, expected: u32 },

    #[error("Unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("Pipeline {pipeline} cannot read a {source_kind} source")]
    SourceMismatch {
        pipeline: String,
        source_kind: &'static str,
    },

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid {name}: {value:?} ({expected})")]
    InvalidSetting {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Erreur d'extraction (HTTP, fichier, contenu)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
}

impl FetchError {
    pub fn payload(url: &str, reason: impl Into<String>) -> Self {
        Self::Payload {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Erreur du puits relationnel, propagée telle quelle
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Failed to create pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Table {table} has no column {column}")]
    UnknownColumn { table: String, column: String },

    #[error("Sink failure: {0}")]
    Failed(String),
}

/// Erreur d'une exécution, étiquetée par étape
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("extract: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform: {0}")]
    Transform(#[from] CityGeoError),

    #[error("transform: invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("load: {0}")]
    Load(#[from] SinkError),
}

impl EtlError {
    /// Nom de l'étape en échec
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Fetch(_) => "extract",
            Self::Transform(_) | Self::Pattern(_) => "transform",
            Self::Load(_) => "load",
        }
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
