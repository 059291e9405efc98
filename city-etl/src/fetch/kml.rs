//! Lecture d'un document KML en dataset
//!
//! Chaque `Placemark` donne une ligne `name`, `description` et la géométrie
//! brute `geometry` (altitude conservée).

use std::path::Path;

use citygeo::{Coord, Dataset, FieldDef, FieldKind, Schema, Shape, Value, RAW_GEOMETRY_COLUMN};
use roxmltree::{Document, Node};
use tracing::{info, warn};

use crate::error::{FetchError, Result};

const GEOMETRY_TAGS: &[&str] = &["Point", "LineString", "Polygon", "MultiGeometry"];

/// Lit un fichier KML téléchargé
pub fn read_kml(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(FetchError::from)?;
    parse_kml(&text, &path.display().to_string())
}

/// Construit un dataset depuis le texte d'un document KML
pub fn parse_kml(text: &str, origin: &str) -> Result<Dataset> {
    let doc = Document::parse(text).map_err(|e| FetchError::payload(origin, e.to_string()))?;

    let mut dataset = Dataset::new(Schema::new(vec![
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new(RAW_GEOMETRY_COLUMN, FieldKind::Shape),
    ])?);

    let mut invalid = 0usize;
    let placemarks = doc
        .descendants()
        .filter(|n| is_tag(n, "Placemark"));
    for (idx, placemark) in placemarks.enumerate() {
        let geometry = match placemark_shape(placemark) {
            Ok(Some(shape)) => Value::Shape(shape),
            Ok(None) => Value::Null,
            Err(reason) => {
                warn!(placemark = idx, reason = %reason, "Unreadable placemark geometry");
                invalid += 1;
                Value::Null
            }
        };
        dataset.push(vec![
            child_text(placemark, "name"),
            child_text(placemark, "description"),
            geometry,
        ])?;
    }

    info!(origin = %origin, placemarks = dataset.len(), invalid, "KML read");
    Ok(dataset)
}

fn is_tag(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn is_geometry(node: &Node<'_, '_>) -> bool {
    node.is_element() && GEOMETRY_TAGS.contains(&node.tag_name().name())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_tag(c, name))
}

/// Texte d'un sous-élément (CDATA compris) ; vide -> Null
fn child_text(node: Node<'_, '_>, name: &str) -> Value {
    child(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or(Value::Null, Value::from)
}

fn placemark_shape(placemark: Node<'_, '_>) -> Result<Option<Shape>, String> {
    placemark
        .children()
        .find(is_geometry)
        .map(shape_of)
        .transpose()
}

fn shape_of(node: Node<'_, '_>) -> Result<Shape, String> {
    match node.tag_name().name() {
        "Point" => {
            let coords = coordinates_of(node)?;
            match coords.as_slice() {
                [c] => Ok(Shape::Point(*c)),
                other => Err(format!("Point with {} positions", other.len())),
            }
        }
        "LineString" => Ok(Shape::LineString(coordinates_of(node)?)),
        "Polygon" => Ok(Shape::Polygon(rings_of(node)?)),
        "MultiGeometry" => multi_of(node),
        other => Err(format!("unsupported element {other}")),
    }
}

fn coordinates_of(node: Node<'_, '_>) -> Result<Vec<Coord>, String> {
    let text = child(node, "coordinates")
        .and_then(|c| c.text())
        .ok_or_else(|| format!("{} without coordinates", node.tag_name().name()))?;
    parse_coordinates(text)
}

/// Anneau extérieur puis anneaux intérieurs
fn rings_of(polygon: Node<'_, '_>) -> Result<Vec<Vec<Coord>>, String> {
    let mut rings = Vec::new();
    for boundary in ["outerBoundaryIs", "innerBoundaryIs"] {
        for b in polygon.children().filter(|c| is_tag(c, boundary)) {
            let ring = child(b, "LinearRing").ok_or("boundary without LinearRing")?;
            rings.push(coordinates_of(ring)?);
        }
    }
    if rings.is_empty() {
        return Err("Polygon without boundary".into());
    }
    Ok(rings)
}

/// Une MultiGeometry homogène devient la géométrie Multi correspondante
fn multi_of(node: Node<'_, '_>) -> Result<Shape, String> {
    let parts = node
        .children()
        .filter(is_geometry)
        .map(shape_of)
        .collect::<Result<Vec<_>, _>>()?;

    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut polygons = Vec::new();
    for part in parts {
        match part {
            Shape::Point(c) => points.push(c),
            Shape::MultiPoint(cs) => points.extend(cs),
            Shape::LineString(cs) => lines.push(cs),
            Shape::MultiLineString(ls) => lines.extend(ls),
            Shape::Polygon(rings) => polygons.push(rings),
            Shape::MultiPolygon(ps) => polygons.extend(ps),
        }
    }
    match (points.is_empty(), lines.is_empty(), polygons.is_empty()) {
        (false, true, true) => Ok(Shape::MultiPoint(points)),
        (true, false, true) => Ok(Shape::MultiLineString(lines)),
        (true, true, false) => Ok(Shape::MultiPolygon(polygons)),
        (true, true, true) => Err("empty MultiGeometry".into()),
        _ => Err("mixed MultiGeometry".into()),
    }
}

/// Tuples `lon,lat[,alt]` séparés par des blancs
pub fn parse_coordinates(text: &str) -> Result<Vec<Coord>, String> {
    text.split_whitespace()
        .map(|tuple| {
            let values = tuple
                .split(',')
                .map(|v| v.parse::<f64>().map_err(|_| format!("bad coordinate {tuple:?}")))
                .collect::<Result<Vec<_>, _>>()?;
            match values.as_slice() {
                [x, y] => Ok(Coord::xy(*x, *y)),
                [x, y, z] => Ok(Coord::xyz(*x, *y, *z)),
                _ => Err(format!("bad coordinate {tuple:?}")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <Placemark>
        <name>關渡自行車道</name>
        <description><![CDATA[fid: 3<br>length(M): 1520.4 <br>路線（約12分鐘）]]></description>
        <LineString>
          <coordinates>121.4601,25.1201,0 121.4655,25.1187,0</coordinates>
        </LineString>
      </Placemark>
      <Placemark>
        <name>雙溪</name>
        <MultiGeometry>
          <LineString><coordinates>121.51,25.08 121.52,25.09</coordinates></LineString>
          <LineString><coordinates>121.52,25.09 121.53,25.10</coordinates></LineString>
        </MultiGeometry>
      </Placemark>
      <Placemark>
        <name>壞座標</name>
        <LineString><coordinates>121.5;25.0</coordinates></LineString>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;

    #[test]
    fn test_placemarks() {
        let ds = parse_kml(SAMPLE, "sample").unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.value(0, "name"), Some(&Value::from("關渡自行車道")));
        match ds.value(0, "description") {
            Some(Value::Text(d)) => assert!(d.starts_with("fid: 3<br>")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ds.value(1, "description"), Some(&Value::Null));
    }

    #[test]
    fn test_geometries() {
        let ds = parse_kml(SAMPLE, "sample").unwrap();
        assert_eq!(
            ds.value(0, RAW_GEOMETRY_COLUMN),
            Some(&Value::Shape(Shape::LineString(vec![
                Coord::xyz(121.4601, 25.1201, 0.0),
                Coord::xyz(121.4655, 25.1187, 0.0),
            ])))
        );
        match ds.value(1, RAW_GEOMETRY_COLUMN) {
            Some(Value::Shape(Shape::MultiLineString(lines))) => assert_eq!(lines.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ds.value(2, RAW_GEOMETRY_COLUMN), Some(&Value::Null));
    }

    #[test]
    fn test_polygon_rings() {
        let kml = r#"<kml><Placemark><Polygon>
            <outerBoundaryIs><LinearRing><coordinates>0,0 1,0 1,1 0,0</coordinates></LinearRing></outerBoundaryIs>
            <innerBoundaryIs><LinearRing><coordinates>0.2,0.2 0.4,0.2 0.4,0.4 0.2,0.2</coordinates></LinearRing></innerBoundaryIs>
        </Polygon></Placemark></kml>"#;
        let ds = parse_kml(kml, "polygon").unwrap();
        match ds.value(0, RAW_GEOMETRY_COLUMN) {
            Some(Value::Shape(Shape::Polygon(rings))) => assert_eq!(rings.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(
            parse_coordinates(" 121.5,25.0\n 121.6,25.1,3 ").unwrap(),
            vec![Coord::xy(121.5, 25.0), Coord::xyz(121.6, 25.1, 3.0)]
        );
        assert!(parse_coordinates("121.5").is_err());
    }
}
