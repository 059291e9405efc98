//! Unification des familles de géométries et réduction de dimension
//!
//! Ces opérations agissent sur la géométrie brute (avant reprojection et
//! encodage) et sont idempotentes.

use tracing::debug;

use super::RAW_GEOMETRY_COLUMN;
use crate::dataset::{Dataset, FieldKind, Value};
use crate::error::Result;
use crate::types::Shape;

/// Polygon -> MultiPolygon à un élément ; le reste passe inchangé
pub fn to_multi_polygon(shape: Option<Shape>) -> Option<Shape> {
    match shape {
        Some(Shape::Polygon(rings)) => Some(Shape::MultiPolygon(vec![rings])),
        other => other,
    }
}

/// LineString -> MultiLineString à un élément ; le reste passe inchangé
pub fn to_multi_line_string(shape: Option<Shape>) -> Option<Shape> {
    match shape {
        Some(Shape::LineString(line)) => Some(Shape::MultiLineString(vec![line])),
        other => other,
    }
}

/// Polygon / MultiPolygon 3D -> 2D (tous les anneaux, intérieurs compris)
///
/// Les autres familles conservent leur altitude.
pub fn force_2d_polygon(shape: Option<Shape>) -> Option<Shape> {
    match shape {
        Some(s @ (Shape::Polygon(_) | Shape::MultiPolygon(_))) => Some(s.to_2d()),
        other => other,
    }
}

/// Applique une opération de famille à la colonne brute `geometry`
pub fn map_raw_geometries<F>(dataset: &mut Dataset, mut op: F) -> Result<()>
where
    F: FnMut(Option<Shape>) -> Option<Shape>,
{
    debug!(rows = dataset.len(), "Mapping raw geometries");
    dataset.map_column(RAW_GEOMETRY_COLUMN, FieldKind::Shape, |value| {
        let shape = match value {
            Value::Shape(s) => Some(s),
            _ => None,
        };
        op(shape).map_or(Value::Null, Value::Shape)
    })
}

/// Unifie les polygones en MultiPolygon dans la colonne brute
pub fn unify_polygons(dataset: &mut Dataset) -> Result<()> {
    map_raw_geometries(dataset, to_multi_polygon)
}

/// Unifie les lignes en MultiLineString dans la colonne brute
pub fn unify_lines(dataset: &mut Dataset) -> Result<()> {
    map_raw_geometries(dataset, to_multi_line_string)
}

/// Réduit les polygones 3D en 2D dans la colonne brute
pub fn reduce_polygons_to_2d(dataset: &mut Dataset) -> Result<()> {
    map_raw_geometries(dataset, force_2d_polygon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    fn ring(z: Option<f64>) -> Vec<Coord> {
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]
            .iter()
            .map(|&(x, y)| Coord { x, y, z })
            .collect()
    }

    #[test]
    fn test_polygon_becomes_multi() {
        let poly = Shape::Polygon(vec![ring(None)]);
        assert_eq!(
            to_multi_polygon(Some(poly)),
            Some(Shape::MultiPolygon(vec![vec![ring(None)]]))
        );
    }

    #[test]
    fn test_multi_and_null_unchanged() {
        let multi = Shape::MultiPolygon(vec![vec![ring(None)], vec![ring(None)]]);
        assert_eq!(to_multi_polygon(Some(multi.clone())), Some(multi));
        assert_eq!(to_multi_polygon(None), None);
        let line = Shape::LineString(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]);
        assert_eq!(to_multi_polygon(Some(line.clone())), Some(line));
    }

    #[test]
    fn test_line_becomes_multi() {
        let line = vec![Coord::xyz(0.0, 0.0, 1.0), Coord::xyz(1.0, 1.0, 2.0)];
        assert_eq!(
            to_multi_line_string(Some(Shape::LineString(line.clone()))),
            Some(Shape::MultiLineString(vec![line]))
        );
    }

    #[test]
    fn test_force_2d_keeps_interiors() {
        let poly = Shape::Polygon(vec![ring(Some(3.0)), ring(Some(4.0))]);
        let flat = force_2d_polygon(Some(poly)).unwrap();
        assert_eq!(flat, Shape::Polygon(vec![ring(None), ring(None)]));
        assert_eq!(force_2d_polygon(Some(flat.clone())), Some(flat));
    }

    #[test]
    fn test_force_2d_leaves_lines() {
        let line = Shape::LineString(vec![Coord::xyz(0.0, 0.0, 1.0), Coord::xyz(1.0, 1.0, 2.0)]);
        assert_eq!(force_2d_polygon(Some(line.clone())), Some(line));
    }
}
