//! Normalisation des géométries d'un dataset
//!
//! Pipeline : géométrie brute -> (unification de famille, réduction 2D)
//! -> reprojection vers le SRID cible -> EWKB canonique dans `wkb_geometry`.
//!
//! Une géométrie qui ne peut pas être reprojetée ou qui ne respecte pas le
//! contrat devient Null ; le dataset n'est jamais abandonné.

pub mod family;
pub mod point;

pub use family::{
    force_2d_polygon, reduce_polygons_to_2d, to_multi_line_string, to_multi_polygon,
    unify_lines, unify_polygons,
};
pub use point::point_from_values;

use tracing::{debug, info, warn};

use crate::dataset::{Dataset, FieldDef, FieldKind, Value};
use crate::encode::encode;
use crate::error::Result;
use crate::reproject::Reprojector;
use crate::types::{CanonicalGeometry, GeometryType, Shape};

/// SRID des données publiées
pub const TARGET_SRID: u32 = 4326;

/// Colonne de la géométrie canonique
pub const CANONICAL_COLUMN: &str = "wkb_geometry";

/// Colonne de la géométrie brute, supprimée avant chargement
pub const RAW_GEOMETRY_COLUMN: &str = "geometry";

/// Colonnes recevant les coordonnées reprojetées d'un point
pub const LNG_COLUMN: &str = "lng";
pub const LAT_COLUMN: &str = "lat";

/// Bilan d'une normalisation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Nombre d'enregistrements traités
    pub records: usize,
    /// Géométries canoniques produites
    pub encoded: usize,
    /// Enregistrements sans géométrie en entrée
    pub missing: usize,
    /// Géométries présentes mais dégradées en Null
    pub degraded: usize,
}

/// Normaliseur lié à un SRID source, un SRID cible et un contrat
pub struct Normalizer {
    source_srid: u32,
    target_srid: u32,
    contract: GeometryType,
    reprojector: Reprojector,
}

impl Normalizer {
    /// Normaliseur vers EPSG:4326
    pub fn new(source_srid: u32, contract: GeometryType) -> Result<Self> {
        Self::with_target(source_srid, TARGET_SRID, contract)
    }

    pub fn with_target(source_srid: u32, target_srid: u32, contract: GeometryType) -> Result<Self> {
        let reprojector = Reprojector::new(source_srid, target_srid)?;
        debug!(
            source = source_srid,
            target = target_srid,
            engine = reprojector.description(),
            "Normalizer ready"
        );
        Ok(Self {
            source_srid,
            target_srid,
            contract,
            reprojector,
        })
    }

    pub fn source_srid(&self) -> u32 {
        self.source_srid
    }

    pub fn target_srid(&self) -> u32 {
        self.target_srid
    }

    pub fn contract(&self) -> GeometryType {
        self.contract
    }

    /// Reprojette une géométrie brute vers le SRID cible
    ///
    /// Lorsque source et cible sont identiques, les coordonnées font tout de
    /// même l'aller-retour par le pivot géographique.
    pub fn reproject(&self, shape: &Shape) -> Result<Shape> {
        self.reprojector.transform_shape(shape)
    }

    /// Reprojette puis encode une géométrie selon le contrat
    pub fn finalize(&self, shape: &Shape) -> Result<CanonicalGeometry> {
        let projected = self.reproject(shape)?;
        encode(&projected, self.contract, self.target_srid)
    }

    /// Version tolérante de `finalize` : Null en cas d'échec
    pub fn canonical_value(&self, shape: Option<&Shape>) -> Value {
        match shape.map(|s| self.finalize(s)) {
            Some(Ok(geom)) => Value::Geometry(geom),
            Some(Err(e)) => {
                debug!(error = %e, "Geometry degraded to null");
                Value::Null
            }
            None => Value::Null,
        }
    }

    /// Construit des points depuis deux colonnes x / y
    ///
    /// Les valeurs manquantes ou non numériques donnent une géométrie nulle.
    /// Avec `write_back`, les coordonnées reprojetées sont écrites dans
    /// `lng` / `lat` (Null pour les points vides). La géométrie canonique
    /// est placée dans `wkb_geometry`.
    pub fn points_from_xy(
        &self,
        dataset: &mut Dataset,
        x_column: &str,
        y_column: &str,
        write_back: bool,
    ) -> Result<NormalizeReport> {
        let xs: Vec<Value> = dataset.column(x_column)?.cloned().collect();
        let ys: Vec<Value> = dataset.column(y_column)?.cloned().collect();

        let mut report = NormalizeReport {
            records: dataset.len(),
            ..Default::default()
        };
        let mut geometries = Vec::with_capacity(dataset.len());
        let mut lngs = Vec::with_capacity(dataset.len());
        let mut lats = Vec::with_capacity(dataset.len());

        for (row, (x, y)) in xs.iter().zip(&ys).enumerate() {
            let Some(point) = point_from_values(x, y) else {
                report.missing += 1;
                geometries.push(Value::Null);
                lngs.push(Value::Null);
                lats.push(Value::Null);
                continue;
            };

            let projected = self
                .reproject(&point)
                .and_then(|p| encode(&p, self.contract, self.target_srid).map(|g| (p, g)));
            match projected {
                Ok((Shape::Point(c), geom)) => {
                    report.encoded += 1;
                    geometries.push(Value::Geometry(geom));
                    lngs.push(Value::Float(c.x));
                    lats.push(Value::Float(c.y));
                }
                Ok((_, geom)) => {
                    report.encoded += 1;
                    geometries.push(Value::Geometry(geom));
                    lngs.push(Value::Null);
                    lats.push(Value::Null);
                }
                Err(e) => {
                    warn!(row, error = %e, "Point degraded to null");
                    report.degraded += 1;
                    geometries.push(Value::Null);
                    lngs.push(Value::Null);
                    lats.push(Value::Null);
                }
            }
        }

        if write_back {
            dataset.set_column(FieldDef::new(LNG_COLUMN, FieldKind::Float), lngs)?;
            dataset.set_column(FieldDef::new(LAT_COLUMN, FieldKind::Float), lats)?;
        }
        dataset.set_column(
            FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(self.contract)),
            geometries,
        )?;

        info!(
            records = report.records,
            encoded = report.encoded,
            missing = report.missing,
            degraded = report.degraded,
            source = self.source_srid,
            "Points normalized"
        );
        Ok(report)
    }

    /// Remplace la colonne brute `geometry` par `wkb_geometry`
    pub fn canonicalize(&self, dataset: &mut Dataset) -> Result<NormalizeReport> {
        let raw = dataset.drop_column(RAW_GEOMETRY_COLUMN)?;

        let mut report = NormalizeReport {
            records: raw.len(),
            ..Default::default()
        };
        let mut geometries = Vec::with_capacity(raw.len());

        for (row, value) in raw.into_iter().enumerate() {
            let shape = match value {
                Value::Shape(shape) => shape,
                Value::Null => {
                    report.missing += 1;
                    geometries.push(Value::Null);
                    continue;
                }
                other => {
                    warn!(row, kind = other.kind_name(), "Unexpected raw geometry value");
                    report.degraded += 1;
                    geometries.push(Value::Null);
                    continue;
                }
            };

            match self.finalize(&shape) {
                Ok(geom) => {
                    report.encoded += 1;
                    geometries.push(Value::Geometry(geom));
                }
                Err(e) => {
                    warn!(row, error = %e, "Geometry degraded to null");
                    report.degraded += 1;
                    geometries.push(Value::Null);
                }
            }
        }

        dataset.set_column(
            FieldDef::new(CANONICAL_COLUMN, FieldKind::Geometry(self.contract)),
            geometries,
        )?;

        info!(
            records = report.records,
            encoded = report.encoded,
            missing = report.missing,
            degraded = report.degraded,
            source = self.source_srid,
            contract = %self.contract,
            "Geometries normalized"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Schema;
    use crate::types::Coord;

    fn xy_dataset(rows: &[(Value, Value)]) -> Dataset {
        let schema = Schema::new(vec![
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("x", FieldKind::Text),
            FieldDef::new("y", FieldKind::Text),
        ])
        .unwrap();
        let mut ds = Dataset::new(schema);
        for (i, (x, y)) in rows.iter().enumerate() {
            ds.push(vec![Value::Text(format!("p{i}")), x.clone(), y.clone()])
                .unwrap();
        }
        ds
    }

    #[test]
    fn test_points_from_xy_degrades_garbage() {
        let mut ds = xy_dataset(&[
            (Value::from("121.5"), Value::from("25.0")),
            (Value::from("abc"), Value::from("25.0")),
            (Value::Null, Value::Null),
        ]);
        let normalizer = Normalizer::new(4326, GeometryType::Point).unwrap();
        let report = normalizer.points_from_xy(&mut ds, "x", "y", true).unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(report.encoded, 1);
        assert_eq!(report.missing, 2);
        assert!(matches!(ds.value(0, CANONICAL_COLUMN), Some(Value::Geometry(_))));
        assert_eq!(ds.value(1, CANONICAL_COLUMN), Some(&Value::Null));
        assert_eq!(ds.value(2, LNG_COLUMN), Some(&Value::Null));
        let lng = ds.value(0, LNG_COLUMN).and_then(Value::as_f64).unwrap();
        assert!((lng - 121.5).abs() < 1e-9);
    }

    #[test]
    fn test_canonicalize_drops_raw_column() {
        let schema = Schema::new(vec![
            FieldDef::new("id", FieldKind::Integer),
            FieldDef::new(RAW_GEOMETRY_COLUMN, FieldKind::Shape),
        ])
        .unwrap();
        let mut ds = Dataset::new(schema);
        ds.push(vec![
            Value::Integer(1),
            Value::Shape(Shape::Point(Coord::xy(121.5, 25.0))),
        ])
        .unwrap();
        ds.push(vec![
            Value::Integer(2),
            Value::Shape(Shape::LineString(vec![
                Coord::xy(121.5, 25.0),
                Coord::xy(121.6, 25.1),
            ])),
        ])
        .unwrap();
        ds.push(vec![Value::Integer(3), Value::Null]).unwrap();

        let normalizer = Normalizer::new(4326, GeometryType::Point).unwrap();
        let report = normalizer.canonicalize(&mut ds).unwrap();

        assert_eq!(
            report,
            NormalizeReport {
                records: 3,
                encoded: 1,
                missing: 1,
                degraded: 1
            }
        );
        assert!(ds.schema().field(RAW_GEOMETRY_COLUMN).is_none());
        assert_eq!(
            ds.schema().field(CANONICAL_COLUMN).map(|f| f.kind),
            Some(FieldKind::Geometry(GeometryType::Point))
        );
    }

    #[test]
    fn test_canonical_value_null_on_mismatch() {
        let normalizer = Normalizer::new(4326, GeometryType::MultiPolygon).unwrap();
        let point = Shape::Point(Coord::xy(121.5, 25.0));
        assert_eq!(normalizer.canonical_value(Some(&point)), Value::Null);
        assert_eq!(normalizer.canonical_value(None), Value::Null);
    }
}
