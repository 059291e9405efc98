//! Définition et implémentation des commandes CLI
//!
//! - `run` : extraction, normalisation, chargement PostGIS
//! - `list` : pipelines disponibles
//! - `to-geojson` : dataset normalisé -> GeoJSON (sans DB)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use city_etl::config::{PipelineConfig, Settings};
use city_etl::export::export_to_geojson;
use city_etl::load::{
    create_pool, test_connection, DatabaseConfig, DatabaseOverrides, MemorySink, PostgresSink,
};
use city_etl::pipelines::{self, Pipeline};
use city_etl::report::RunReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, normalize and load a pipeline into PostGIS
    Run {
        /// Pipeline name (see `list`)
        pipeline: String,

        /// JSON configuration overriding the embedded preset
        #[arg(long)]
        config: Option<PathBuf>,

        /// Prepare and plan the load against an in-memory sink, no database
        #[arg(long)]
        dry_run: bool,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// List available pipelines
    List,

    /// Export the normalized dataset of a pipeline to GeoJSON (no database required)
    ToGeojson {
        /// Pipeline name
        pipeline: String,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration overriding the embedded preset
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Surcharges de connexion PostgreSQL
#[derive(Args, Debug, Default)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / dashboard)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5433)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl From<DbArgs> for DatabaseOverrides {
    fn from(args: DbArgs) -> Self {
        Self {
            host: args.host,
            database: args.database,
            user: args.user,
            password: args.password,
            port: args.port,
            ssl: args.ssl,
        }
    }
}

/// Exécute la commande run
pub async fn cmd_run(
    pipeline: &str,
    config_path: Option<&Path>,
    dry_run: bool,
    report_path: Option<&Path>,
    db: DbArgs,
) -> Result<()> {
    let config = load_pipeline_config(pipeline, config_path)?;
    let settings = Settings::from_env();

    println!("=== Run {} ===", config.name);
    println!("Load behavior: {}", config.load.load_behavior);
    println!("Default table: {}", config.load.default_table);
    if let Some(history) = &config.load.history_table {
        println!("History table: {}", history);
    }
    println!("Source CRS: EPSG:{}", config.from_crs);
    println!("Data dir: {}", settings.data_dir.display());

    let report = if dry_run {
        println!("Dry run: in-memory sink");
        let mut sink = MemorySink::new();
        pipelines::run(&mut sink, &config, &settings, true).await
    } else {
        let mut db_config = DatabaseConfig::from_env()?;
        db_config.apply_overrides(db.into())?;
        println!(
            "Database: {}@{}:{}/{} (SSL: {:?})",
            db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
        );

        let pool = create_pool(&db_config)?;
        test_connection(&pool)
            .await
            .context("Failed to connect to PostgreSQL")?;
        println!("Connected to PostgreSQL");

        let mut sink = PostgresSink::new(pool);
        pipelines::run(&mut sink, &config, &settings, false).await
    };

    finish(&report, report_path)
}

fn finish(report: &RunReport, report_path: Option<&Path>) -> Result<()> {
    report.display();
    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .context(format!("Failed to write report: {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    if report.is_failure() {
        anyhow::bail!(
            "Pipeline {} failed at {} stage: {}",
            report.pipeline,
            report.failed_stage.as_deref().unwrap_or("unknown"),
            report.error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Affiche les pipelines disponibles
pub fn cmd_list() {
    for pipeline in Pipeline::ALL {
        println!("{:<20} {}", pipeline.name(), pipeline.description());
    }
}

/// Exécute la commande to-geojson
pub async fn cmd_export(pipeline: &str, output: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_pipeline_config(pipeline, config_path)?;
    let settings = Settings::from_env();

    let prepared = pipelines::prepare(&config, &settings)
        .await
        .with_context(|| format!("Failed to prepare {}", config.name))?;
    export_to_geojson(&prepared.dataset, output)?;

    println!(
        "Exported {} features ({} degraded geometries) to {}",
        prepared.dataset.len(),
        prepared.degraded(),
        output.display()
    );
    Ok(())
}

/// Preset embarqué ou fichier JSON
fn load_pipeline_config(pipeline: &str, path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::from_preset(pipeline)?,
    };
    if config.name != pipeline {
        anyhow::bail!(
            "Configuration describes pipeline {}, not {}",
            config.name,
            pipeline
        );
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_preset() {
        let config = load_pipeline_config("work_sidewalk", None).unwrap();
        assert_eq!(config.from_crs, 3826);
        assert!(load_pipeline_config("unknown", None).is_err());
    }

    #[test]
    fn test_config_name_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(
            &path,
            r#"{"name":"heal_hospital","source":{"kind":"data_taipei","rid":"r","page_id":"p"},
                "from_crs":4326,"load_behavior":"append","default_table":"t","geometry_type":"Point"}"#,
        )
        .unwrap();
        assert!(load_pipeline_config("heal_hospital", Some(&path)).is_ok());
        assert!(load_pipeline_config("work_sidewalk", Some(&path)).is_err());
    }

    #[test]
    fn test_db_overrides() {
        let args = DbArgs {
            host: Some("db".into()),
            port: Some(5432),
            ..Default::default()
        };
        let overrides: DatabaseOverrides = args.into();
        assert_eq!(overrides.host.as_deref(), Some("db"));
        assert_eq!(overrides.port, Some(5432));
    }
}
