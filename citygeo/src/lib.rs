//! # citygeo
//!
//! Normalisation des géométries des jeux de données ouverts publiés sur le
//! tableau de bord urbain.
//!
//! ## Features
//!
//! - Modèle tabulaire explicite (`Dataset`, `Schema`, `Value`)
//! - Géométries brutes 2D/3D (`Shape`) et contrat de type fermé (`GeometryType`)
//! - Unification Polygon -> MultiPolygon, LineString -> MultiLineString, réduction 2D
//! - Reprojection en Rust pur (4326, 3857, TWD97 3826/3825), PROJ en option
//! - Encodage EWKB canonique (hex majuscule, entrée texte PostGIS)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use citygeo::{GeometryType, Normalizer};
//!
//! let normalizer = Normalizer::new(3826, GeometryType::MultiPolygon)?;
//! citygeo::normalize::unify_polygons(&mut dataset)?;
//! citygeo::normalize::reduce_polygons_to_2d(&mut dataset)?;
//! let report = normalizer.canonicalize(&mut dataset)?;
//! println!("{} géométries dégradées", report.degraded);
//! ```

pub mod convert;
pub mod dataset;
pub mod encode;
pub mod error;
pub mod normalize;
pub mod reproject;
pub mod types;

pub use dataset::{Dataset, FieldDef, FieldKind, Row, Schema, Value};
pub use encode::encode;
pub use error::{CityGeoError, Result};
pub use normalize::{
    NormalizeReport, Normalizer, CANONICAL_COLUMN, RAW_GEOMETRY_COLUMN, TARGET_SRID,
};
pub use reproject::Reprojector;
pub use types::{CanonicalGeometry, Coord, GeometryType, Shape, ShapeKind};
