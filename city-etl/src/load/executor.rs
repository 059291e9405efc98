//! Sauvegarde d'un dataset : validation, plan, exécution

use std::time::{Duration, Instant};

use citygeo::{Dataset, FieldKind, Value, CANONICAL_COLUMN, RAW_GEOMETRY_COLUMN, TARGET_SRID};
use tracing::{debug, info};

use super::directive::{GeometryTarget, LoadBehavior, LoadDirective};
use super::plan::WritePlan;
use super::Sink;
use crate::error::{ConfigError, Result};

/// Résultat d'une sauvegarde
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub behavior: LoadBehavior,
    /// Tables écrites, table courante en premier
    pub tables: Vec<String>,
    /// Lignes du dataset
    pub rows: usize,
    /// Lignes insérées, toutes tables confondues
    pub rows_written: u64,
    pub elapsed: Duration,
}

/// Sauvegarde un dataset sans géométrie
pub async fn save_dataset<S: Sink>(
    sink: &mut S,
    dataset: &Dataset,
    directive: &LoadDirective,
) -> Result<SaveReport> {
    if let Some(column) = spatial_column(dataset) {
        return Err(ConfigError::GeometryOnPlainPath(column).into());
    }
    run(sink, dataset, directive).await
}

/// Sauvegarde un dataset portant une géométrie canonique
///
/// Toute valeur non nulle de la colonne désignée doit être du type déclaré,
/// en EPSG:4326.
pub async fn save_geo_dataset<S: Sink>(
    sink: &mut S,
    dataset: &Dataset,
    directive: &LoadDirective,
) -> Result<SaveReport> {
    let target = directive.validate_geometry()?;
    check_geometry(dataset, &target)?;
    run(sink, dataset, directive).await
}

async fn run<S: Sink>(
    sink: &mut S,
    dataset: &Dataset,
    directive: &LoadDirective,
) -> Result<SaveReport> {
    let validated = directive.validate()?;
    let plan = WritePlan::build(&validated, dataset);
    debug!(
        sink = sink.name(),
        behavior = %validated.behavior(),
        steps = plan.steps.len(),
        "Executing write plan"
    );

    let start = Instant::now();
    let rows_written = sink.execute(&plan).await?;
    let elapsed = start.elapsed();

    let tables: Vec<String> = plan.tables().iter().map(|t| t.to_string()).collect();
    info!(
        sink = sink.name(),
        behavior = %validated.behavior(),
        tables = %tables.join(","),
        rows = dataset.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Dataset saved"
    );

    Ok(SaveReport {
        behavior: validated.behavior(),
        tables,
        rows: dataset.len(),
        rows_written,
        elapsed,
    })
}

/// Première colonne géométrique du dataset, par type ou par nom
fn spatial_column(dataset: &Dataset) -> Option<String> {
    dataset
        .schema()
        .fields()
        .iter()
        .find(|f| {
            f.kind.is_spatial() || f.name == CANONICAL_COLUMN || f.name == RAW_GEOMETRY_COLUMN
        })
        .map(|f| f.name.clone())
}

fn check_geometry(dataset: &Dataset, target: &GeometryTarget) -> Result<(), ConfigError> {
    let field = dataset
        .schema()
        .field(&target.column)
        .ok_or_else(|| ConfigError::MissingGeometryColumn(target.column.clone()))?;

    match field.kind {
        FieldKind::Geometry(declared) if declared == target.geometry_type => {}
        FieldKind::Geometry(declared) => {
            return Err(ConfigError::ColumnTypeMismatch {
                column: field.name.clone(),
                expected: target.geometry_type,
                found: declared,
            })
        }
        other => {
            return Err(ConfigError::NotCanonical {
                column: field.name.clone(),
                kind: other.to_string(),
            })
        }
    }

    // une seule colonne géométrique par table
    if let Some(extra) = dataset
        .schema()
        .fields()
        .iter()
        .find(|f| f.name != target.column && f.kind.is_spatial())
    {
        return Err(ConfigError::NotCanonical {
            column: extra.name.clone(),
            kind: extra.kind.to_string(),
        });
    }

    let Ok(values) = dataset.column(&target.column) else {
        return Err(ConfigError::MissingGeometryColumn(target.column.clone()));
    };
    for (row, value) in values.enumerate() {
        match value {
            Value::Null => {}
            Value::Geometry(g) => {
                if g.geometry_type != target.geometry_type {
                    return Err(ConfigError::GeometryTypeMismatch {
                        row,
                        expected: target.geometry_type,
                        found: g.geometry_type,
                    });
                }
                if g.srid != TARGET_SRID {
                    return Err(ConfigError::SridMismatch {
                        row,
                        srid: g.srid,
                        expected: TARGET_SRID,
                    });
                }
            }
            other => {
                return Err(ConfigError::NotCanonical {
                    column: target.column.clone(),
                    kind: other.kind_name().to_string(),
                })
            }
        }
    }
    Ok(())
}
