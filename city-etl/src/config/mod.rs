//! Configuration : réglages d'environnement et description des pipelines

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::load::LoadDirective;

/// Pipelines disponibles en preset
pub const PRESETS: &[&str] = &[
    "heal_hospital",
    "tran_ubike_station",
    "work_sidewalk",
    "building_permit",
    "work_riverside_bike_path",
    "patrol_debrisarea",
];

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Réglages globaux lus depuis l'environnement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Répertoire des téléchargements et du cache de jetons
    pub data_dir: PathBuf,
    pub https_proxy: Option<String>,
    /// Timeout HTTP par défaut
    pub http_timeout: Duration,
    pub tdx_client_id: Option<String>,
    pub tdx_client_secret: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            https_proxy: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            tdx_client_id: None,
            tdx_client_secret: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            data_dir: non_empty("CITY_ETL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            https_proxy: non_empty("CITY_ETL_HTTPS_PROXY"),
            http_timeout: non_empty("CITY_ETL_HTTP_TIMEOUT")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            tdx_client_id: non_empty("TDX_CLIENT_ID"),
            tdx_client_secret: non_empty("TDX_CLIENT_SECRET"),
        }
    }

    /// Identifiants TDX (client_id, client_secret)
    pub fn tdx_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .tdx_client_id
            .as_deref()
            .ok_or(ConfigError::MissingSetting("TDX_CLIENT_ID"))?;
        let secret = self
            .tdx_client_secret
            .as_deref()
            .ok_or(ConfigError::MissingSetting("TDX_CLIENT_SECRET"))?;
        Ok((id, secret))
    }
}

/// Source d'un pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// API data.taipei, paginée
    DataTaipei { rid: String, page_id: String },
    /// API TDX, une requête par ville, jeton bearer
    Tdx { endpoints: Vec<TdxEndpoint> },
    /// Fichier GeoJSON téléchargé dans le répertoire de données
    Geojson { url: String, file_name: String },
    /// Fichier XML data.taipei ; `page_id` donne la date de publication
    Xml {
        url: String,
        file_name: String,
        page_id: String,
    },
    /// Fichier KML data.taipei ; `page_id` donne la date de publication
    Kml {
        url: String,
        file_name: String,
        page_id: String,
    },
    /// Archive zip d'un shapefile, extraite dans `folder` sous le répertoire de données
    ZippedShapefile {
        url: String,
        file_name: String,
        folder: String,
    },
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataTaipei { .. } => "data_taipei",
            Self::Tdx { .. } => "tdx",
            Self::Geojson { .. } => "geojson",
            Self::Xml { .. } => "xml",
            Self::Kml { .. } => "kml",
            Self::ZippedShapefile { .. } => "zipped_shapefile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TdxEndpoint {
    pub county: String,
    pub url: String,
}

/// Description complète d'un pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub name: String,
    pub source: SourceConfig,
    /// SRID des coordonnées sources
    pub from_crs: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub load: LoadDirective,
}

fn default_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl PipelineConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self, ConfigError> {
        match preset {
            "heal_hospital" => Self::load_embedded(include_str!("presets/heal_hospital.json")),
            "tran_ubike_station" => {
                Self::load_embedded(include_str!("presets/tran_ubike_station.json"))
            }
            "work_sidewalk" => Self::load_embedded(include_str!("presets/work_sidewalk.json")),
            "building_permit" => Self::load_embedded(include_str!("presets/building_permit.json")),
            "work_riverside_bike_path" => {
                Self::load_embedded(include_str!("presets/work_riverside_bike_path.json"))
            }
            "patrol_debrisarea" => {
                Self::load_embedded(include_str!("presets/patrol_debrisarea.json"))
            }
            _ => Err(ConfigError::UnknownPipeline(preset.to_string())),
        }
    }

    fn load_embedded(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
