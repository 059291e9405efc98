//! Shapefiles publiés en archive zip
//!
//! L'archive est extraite dans le répertoire de données puis le `.shp` est lu
//! avec sa table `.dbf`. Les champs retenus sont déclarés par le pipeline
//! (noms comparés en minuscules) ; la géométrie va dans la colonne brute.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use citygeo::{Coord, Dataset, FieldDef, FieldKind, Schema, Shape, Value, RAW_GEOMETRY_COLUMN};
use serde_json::Value as Json;
use shapefile::dbase::FieldValue;
use shapefile::{Point, PointM, PointZ, PolygonRing};
use tracing::{debug, info, warn};

use super::geojson::warn_unseen;
use super::record::json_value;
use crate::error::{FetchError, Result};

/// Extrait l'archive dans `target` et renvoie les fichiers écrits
pub fn unzip_to(archive_path: &Path, target: &Path) -> Result<Vec<PathBuf>, FetchError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(target)?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping unsafe archive entry");
            continue;
        };
        let out = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut dest = File::create(&out)?;
        std::io::copy(&mut entry, &mut dest)?;
        debug!(path = %out.display(), "Extracted");
        written.push(out);
    }

    info!(archive = %archive_path.display(), files = written.len(), "Archive extracted");
    Ok(written)
}

/// Premier `.shp` parmi les fichiers extraits
pub fn find_shp(files: &[PathBuf]) -> Result<&Path, FetchError> {
    files
        .iter()
        .find(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
        })
        .map(PathBuf::as_path)
        .ok_or_else(|| FetchError::payload("archive", "no .shp file in archive"))
}

/// Lit un shapefile et sa table attributaire
pub fn read_shapefile(path: &Path, fields: &[FieldDef]) -> Result<Dataset> {
    let origin = path.display().to_string();
    let mut reader = shapefile::Reader::from_path(path).map_err(FetchError::from)?;

    let mut defs = fields.to_vec();
    defs.push(FieldDef::new(RAW_GEOMETRY_COLUMN, FieldKind::Shape));
    let mut dataset = Dataset::new(Schema::new(defs)?);

    let mut seen = vec![false; fields.len()];
    let mut empty = 0usize;
    for (idx, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(FetchError::from)?;
        let attributes: HashMap<String, FieldValue> = record.into();
        let attributes: HashMap<String, FieldValue> = attributes
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        let mut row = Vec::with_capacity(fields.len() + 1);
        for (field, seen) in fields.iter().zip(seen.iter_mut()) {
            let value = attributes.get(&field.name);
            *seen |= value.is_some();
            row.push(value.map_or(Value::Null, |v| json_value(&field_json(v), field.kind)));
        }

        let geometry = match to_shape(&shape) {
            Some(shape) => Value::Shape(shape),
            None => {
                debug!(record = idx, "Empty shapefile geometry");
                empty += 1;
                Value::Null
            }
        };
        row.push(geometry);
        dataset.push(row)?;
    }

    warn_unseen(&origin, fields, &seen, dataset.len());
    info!(origin = %origin, records = dataset.len(), empty, "Shapefile read");
    Ok(dataset)
}

/// Valeur dBase en JSON, pour passer par la même conversion que les API
fn field_json(value: &FieldValue) -> Json {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => Json::String(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
        }
        FieldValue::Float(Some(f)) => {
            serde_json::Number::from_f64(f64::from(*f)).map_or(Json::Null, Json::Number)
        }
        FieldValue::Integer(i) => Json::from(*i),
        FieldValue::Logical(Some(b)) => Json::Bool(*b),
        _ => Json::Null,
    }
}

trait ToCoord {
    fn coord(&self) -> Coord;
}

impl ToCoord for Point {
    fn coord(&self) -> Coord {
        Coord::xy(self.x, self.y)
    }
}

impl ToCoord for PointM {
    fn coord(&self) -> Coord {
        Coord::xy(self.x, self.y)
    }
}

impl ToCoord for PointZ {
    fn coord(&self) -> Coord {
        Coord::xyz(self.x, self.y, self.z)
    }
}

fn coords<P: ToCoord>(points: &[P]) -> Vec<Coord> {
    points.iter().map(ToCoord::coord).collect()
}

/// Géométrie brute ; None pour une forme vide
fn to_shape(shape: &shapefile::Shape) -> Option<Shape> {
    use shapefile::Shape as S;
    match shape {
        S::NullShape => None,
        S::Point(p) => Some(Shape::Point(p.coord())),
        S::PointM(p) => Some(Shape::Point(p.coord())),
        S::PointZ(p) => Some(Shape::Point(p.coord())),
        S::Polyline(l) => line_shape(l.parts()),
        S::PolylineM(l) => line_shape(l.parts()),
        S::PolylineZ(l) => line_shape(l.parts()),
        S::Polygon(p) => polygon_shape(p.rings()),
        S::PolygonM(p) => polygon_shape(p.rings()),
        S::PolygonZ(p) => polygon_shape(p.rings()),
        S::Multipoint(m) => point_shape(m.points()),
        S::MultipointM(m) => point_shape(m.points()),
        S::MultipointZ(m) => point_shape(m.points()),
        S::Multipatch(_) => {
            warn!("Multipatch geometry not supported");
            None
        }
    }
}

fn point_shape<P: ToCoord>(points: &[P]) -> Option<Shape> {
    (!points.is_empty()).then(|| Shape::MultiPoint(coords(points)))
}

/// Une partie -> LineString, plusieurs -> MultiLineString
fn line_shape<P: ToCoord>(parts: &[Vec<P>]) -> Option<Shape> {
    match parts {
        [] => None,
        [single] => Some(Shape::LineString(coords(single))),
        many => Some(Shape::MultiLineString(
            many.iter().map(|part| coords(part)).collect(),
        )),
    }
}

/// Chaque anneau extérieur ouvre un polygone, les intérieurs s'y rattachent
fn polygon_shape<P: ToCoord>(rings: &[PolygonRing<P>]) -> Option<Shape> {
    let mut polygons: Vec<Vec<Vec<Coord>>> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push(vec![coords(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(polygon) => polygon.push(coords(points)),
                None => {
                    warn!("Inner ring before any outer ring, kept as exterior");
                    polygons.push(vec![coords(points)]);
                }
            },
        }
    }
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Shape::Polygon),
        _ => Some(Shape::MultiPolygon(polygons)),
    }
}
