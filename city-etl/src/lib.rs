//! # city-etl
//!
//! Publication des données ouvertes du tableau de bord urbain dans PostGIS.
//!
//! ## Étapes
//!
//! - Extraction : API data.taipei, API TDX (jeton OAuth2), fichiers GeoJSON
//! - Transformation : schéma explicite par pipeline, géométrie normalisée
//!   en EWKB EPSG:4326 via `citygeo`
//! - Chargement : append, replace ou current+history, atomique
//!
//! ## Usage CLI
//!
//! ```bash
//! # Charger les hôpitaux (table courante + historique)
//! city-etl run heal_hospital
//!
//! # Exécution à blanc, rapport JSON
//! city-etl run work_sidewalk --dry-run --report ./report.json
//!
//! # Export GeoJSON (sans base de données)
//! city-etl to-geojson tran_ubike_station --output ./ubike.geojson
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod load;
pub mod pipelines;
pub mod report;
pub mod time;

pub use config::{PipelineConfig, Settings};
pub use error::{ConfigError, EtlError, FetchError, Result, SinkError};
pub use load::{
    create_pool, save_dataset, save_geo_dataset, DatabaseConfig, LoadBehavior, LoadDirective,
    MemorySink, PostgresSink, Sink,
};
pub use pipelines::Pipeline;
pub use report::{RunReport, RunStatus};
