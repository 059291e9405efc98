//! Types d'erreurs pour le crate citygeo

use thiserror::Error;

use crate::types::{GeometryType, ShapeKind};

/// Erreurs pouvant survenir lors de la normalisation ou de la manipulation d'un dataset
#[derive(Debug, Error)]
pub enum CityGeoError {
    /// Type de géométrie hors de la liste fermée
    #[error("Unknown geometry type: {0}")]
    UnknownGeometryType(String),

    /// Géométrie vide (aucune coordonnée)
    #[error("Empty geometry")]
    EmptyGeometry,

    /// Coordonnée non finie (NaN, infini)
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    /// Géométrie structurellement invalide pour PostGIS
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Couple de projections non supporté
    #[error("Unsupported projection EPSG:{from} -> EPSG:{to}")]
    UnsupportedProjection { from: u32, to: u32 },

    /// Échec de transformation d'une coordonnée
    #[error("Projection failed: {0}")]
    Projection(String),

    /// Famille de géométrie différente du contrat déclaré
    #[error("Geometry family {found} does not match contract {expected}")]
    ContractMismatch {
        expected: GeometryType,
        found: ShapeKind,
    },

    /// Erreur d'encodage WKB/GeoJSON
    #[error("Encoding error: {0}")]
    Encoding(#[from] geozero::error::GeozeroError),

    /// Colonne dupliquée dans un schéma
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Colonne absente du schéma
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Ligne dont la largeur ne correspond pas au schéma
    #[error("Row has {found} values, schema has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    /// Valeur incompatible avec le type déclaré de la colonne
    #[error("Column {column} expects {expected}, got {found}")]
    ValueKind {
        column: String,
        expected: String,
        found: &'static str,
    },
}

impl CityGeoError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry(reason.into())
    }

    /// Crée une erreur de colonne absente
    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn(name.into())
    }
}

/// Alias de résultat du crate
pub type Result<T, E = CityGeoError> = std::result::Result<T, E>;
