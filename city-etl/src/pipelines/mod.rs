//! Pipelines publiés : extraction, transformation, chargement
//!
//! Chaque pipeline associe un preset de configuration, une extraction, une
//! transformation pure vers un schéma explicite et une sauvegarde,
//! géographique ou non.

pub mod building_permit;
pub mod debris_area;
pub mod hospital;
pub mod riverside_bike_path;
pub mod sidewalk;
pub mod ubike;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use citygeo::{Dataset, FieldDef, NormalizeReport};
use tracing::{error, info};

use crate::auth::{FileTokenCache, TdxAuth};
use crate::config::{PipelineConfig, Settings, SourceConfig};
use crate::error::{ConfigError, Result};
use crate::fetch::{
    find_shp, read_feature_collection, read_kml, read_permits, read_shapefile, unzip_to,
    DataTaipei, HttpFetcher, Record,
};
use crate::load::{save_dataset, save_geo_dataset, Sink};
use crate::report::RunReport;

/// Pipelines connus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Hospital,
    UbikeStation,
    Sidewalk,
    BuildingPermit,
    RiversideBikePath,
    DebrisArea,
}

impl Pipeline {
    pub const ALL: [Pipeline; 6] = [
        Self::Hospital,
        Self::UbikeStation,
        Self::Sidewalk,
        Self::BuildingPermit,
        Self::RiversideBikePath,
        Self::DebrisArea,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hospital => "heal_hospital",
            Self::UbikeStation => "tran_ubike_station",
            Self::Sidewalk => "work_sidewalk",
            Self::BuildingPermit => "building_permit",
            Self::RiversideBikePath => "work_riverside_bike_path",
            Self::DebrisArea => "patrol_debrisarea",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Hospital => "Taipei hospitals (data.taipei, points)",
            Self::UbikeStation => "YouBike stations in Taipei and New Taipei (TDX, points)",
            Self::Sidewalk => "Taipei sidewalks (GeoJSON, TWD97 multipolygons)",
            Self::BuildingPermit => "Taipei building permits (XML, one row per land unit)",
            Self::RiversideBikePath => "Riverside bike paths (KML, 3D multilinestrings)",
            Self::DebrisArea => "Debris flow risk areas (zipped shapefile, TWD97 multipolygons)",
        }
    }

    /// Le pipeline publie une géométrie canonique
    pub fn is_spatial(self) -> bool {
        !matches!(self, Self::BuildingPermit)
    }

    /// Champs attributaires lus dans un fichier géographique
    fn file_fields(self, source_kind: &'static str) -> Result<Vec<FieldDef>> {
        match (self, source_kind) {
            (Self::Sidewalk, "geojson") => Ok(sidewalk::source_fields()),
            (Self::DebrisArea, "zipped_shapefile") => Ok(debris_area::source_fields()),
            (other, source_kind) => Err(ConfigError::SourceMismatch {
                pipeline: other.name().to_string(),
                source_kind,
            }
            .into()),
        }
    }
}

impl FromStr for Pipeline {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownPipeline(s.to_string()))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Données brutes extraites
#[derive(Debug)]
pub enum Extracted {
    /// Enregistrements (API ou XML data.taipei) et date de publication
    Records {
        records: Vec<Record>,
        data_time: Option<DateTime<FixedOffset>>,
    },
    /// Enregistrements par ville
    Counties(Vec<(String, Vec<Record>)>),
    /// Entités avec géométrie brute (GeoJSON, KML, shapefile)
    Features {
        dataset: Dataset,
        data_time: Option<DateTime<FixedOffset>>,
    },
}

impl Extracted {
    fn kind(&self) -> &'static str {
        match self {
            Self::Records { .. } => "records",
            Self::Counties(_) => "county records",
            Self::Features { .. } => "features",
        }
    }
}

/// Dataset prêt à charger
#[derive(Debug)]
pub struct Prepared {
    pub dataset: Dataset,
    /// Absent pour un dataset sans géométrie
    pub normalize: Option<NormalizeReport>,
}

impl Prepared {
    fn spatial(dataset: Dataset, normalize: NormalizeReport) -> Self {
        Self {
            dataset,
            normalize: Some(normalize),
        }
    }

    fn plain(dataset: Dataset) -> Self {
        Self {
            dataset,
            normalize: None,
        }
    }

    /// Géométries dégradées en Null
    pub fn degraded(&self) -> usize {
        self.normalize.as_ref().map_or(0, |n| n.degraded)
    }
}

/// Extraction selon la source configurée
pub async fn extract(
    pipeline: Pipeline,
    config: &PipelineConfig,
    settings: &Settings,
) -> Result<Extracted> {
    let http = HttpFetcher::new(settings, config.timeout())?;

    match &config.source {
        SourceConfig::DataTaipei { rid, page_id } => {
            let api = DataTaipei::new(&http);
            let records = api.fetch_dataset(rid).await?;
            let data_time = api.data_time(page_id, 0).await?;
            Ok(Extracted::Records { records, data_time })
        }
        SourceConfig::Tdx { endpoints } => {
            let (client_id, client_secret) = settings.tdx_credentials()?;
            let cache = FileTokenCache::in_dir(&settings.data_dir);
            let mut auth = TdxAuth::new(&http, cache, client_id, client_secret);
            let token = auth.get_token().await?;

            let mut counties = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                let records: Vec<Record> = http.get_json_bearer(&endpoint.url, &token).await?;
                info!(county = %endpoint.county, records = records.len(), "Stations fetched");
                counties.push((endpoint.county.clone(), records));
            }
            Ok(Extracted::Counties(counties))
        }
        SourceConfig::Geojson { url, file_name } => {
            let fields = pipeline.file_fields(config.source.kind())?;
            let path = http.download_file(file_name, url).await?;
            Ok(Extracted::Features {
                dataset: read_feature_collection(&path, &fields)?,
                data_time: None,
            })
        }
        SourceConfig::Xml {
            url,
            file_name,
            page_id,
        } => {
            let path = http.download_file(file_name, url).await?;
            let records = read_permits(&path)?;
            let data_time = DataTaipei::new(&http).data_time(page_id, 0).await?;
            Ok(Extracted::Records { records, data_time })
        }
        SourceConfig::Kml {
            url,
            file_name,
            page_id,
        } => {
            let path = http.download_file(file_name, url).await?;
            let dataset = read_kml(&path)?;
            let data_time = DataTaipei::new(&http).data_time(page_id, 0).await?;
            Ok(Extracted::Features { dataset, data_time })
        }
        SourceConfig::ZippedShapefile {
            url,
            file_name,
            folder,
        } => {
            let fields = pipeline.file_fields(config.source.kind())?;
            let archive = http.download_file(file_name, url).await?;
            let files = unzip_to(&archive, &http.data_dir().join(folder))?;
            let dataset = read_shapefile(find_shp(&files)?, &fields)?;
            Ok(Extracted::Features {
                dataset,
                data_time: None,
            })
        }
    }
}

/// Transformation pure vers le schéma publié
pub fn transform(pipeline: Pipeline, from_crs: u32, extracted: Extracted) -> Result<Prepared> {
    let (dataset, normalize) = match (pipeline, extracted) {
        (Pipeline::Hospital, Extracted::Records { records, data_time }) => {
            hospital::transform(&records, data_time, from_crs)?
        }
        (Pipeline::UbikeStation, Extracted::Counties(counties)) => {
            ubike::transform(&counties, from_crs)?
        }
        (Pipeline::Sidewalk, Extracted::Features { dataset, data_time }) => {
            sidewalk::transform(dataset, data_time, from_crs)?
        }
        (Pipeline::RiversideBikePath, Extracted::Features { dataset, data_time }) => {
            riverside_bike_path::transform(dataset, data_time, from_crs)?
        }
        (Pipeline::DebrisArea, Extracted::Features { dataset, .. }) => {
            debris_area::transform(dataset, from_crs)?
        }
        (Pipeline::BuildingPermit, Extracted::Records { records, data_time }) => {
            return Ok(Prepared::plain(building_permit::transform(
                &records, data_time,
            )?))
        }
        (pipeline, other) => {
            return Err(ConfigError::SourceMismatch {
                pipeline: pipeline.name().to_string(),
                source_kind: other.kind(),
            }
            .into())
        }
    };
    Ok(Prepared::spatial(dataset, normalize))
}

/// Extraction puis transformation
pub async fn prepare(config: &PipelineConfig, settings: &Settings) -> Result<Prepared> {
    let pipeline: Pipeline = config.name.parse()?;
    // directive invalide : échec avant toute requête
    config.load.validate()?;
    if pipeline.is_spatial() {
        config.load.validate_geometry()?;
    }

    let extracted = extract(pipeline, config, settings).await?;
    transform(pipeline, config.from_crs, extracted)
}

/// Charge un dataset préparé
pub async fn load<S: Sink>(
    sink: &mut S,
    config: &PipelineConfig,
    prepared: &Prepared,
    report: &mut RunReport,
) -> Result<()> {
    let save = if prepared.normalize.is_some() {
        save_geo_dataset(sink, &prepared.dataset, &config.load).await?
    } else {
        save_dataset(sink, &prepared.dataset, &config.load).await?
    };
    report.record_save(&save);
    Ok(())
}

async fn execute<S: Sink>(
    sink: &mut S,
    config: &PipelineConfig,
    settings: &Settings,
    report: &mut RunReport,
) -> Result<()> {
    let prepared = prepare(config, settings).await?;
    match &prepared.normalize {
        Some(normalize) => report.record_normalize(normalize),
        None => report.record_rows(prepared.dataset.len()),
    }
    load(sink, config, &prepared, report).await
}

/// Exécution complète ; l'erreur éventuelle est consignée dans le rapport
pub async fn run<S: Sink>(
    sink: &mut S,
    config: &PipelineConfig,
    settings: &Settings,
    dry_run: bool,
) -> RunReport {
    let start = Instant::now();
    let mut report = RunReport::new(&config.name);

    if let Err(e) = execute(sink, config, settings, &mut report).await {
        error!(pipeline = %config.name, stage = e.stage(), error = %e, "Pipeline failed");
        report.record_failure(&e);
    }

    report.set_duration(start.elapsed());
    report.finalize(dry_run);
    info!(summary = %report.summary(), "Pipeline finished");
    report
}
