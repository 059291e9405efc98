//! Conversions entre `Shape` et les types de l'écosystème (geo, geojson, geozero)

use geozero::error::Result as GeozeroResult;
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry};

use crate::error::{CityGeoError, Result};
use crate::types::{Coord, Ring, Shape};

impl TryFrom<&geo::Geometry<f64>> for Shape {
    type Error = CityGeoError;

    fn try_from(geom: &geo::Geometry<f64>) -> Result<Self> {
        use geo::Geometry as G;

        let shape = match geom {
            G::Point(p) => Shape::Point(Coord::xy(p.x(), p.y())),
            G::Line(l) => Shape::LineString(vec![from_geo(l.start), from_geo(l.end)]),
            G::LineString(ls) => Shape::LineString(line_from_geo(ls)),
            G::Polygon(p) => Shape::Polygon(polygon_from_geo(p)),
            G::MultiPoint(mp) => Shape::MultiPoint(mp.iter().map(|p| from_geo(p.0)).collect()),
            G::MultiLineString(mls) => {
                Shape::MultiLineString(mls.iter().map(line_from_geo).collect())
            }
            G::MultiPolygon(mp) => Shape::MultiPolygon(mp.iter().map(polygon_from_geo).collect()),
            G::Rect(r) => Shape::Polygon(polygon_from_geo(&r.to_polygon())),
            G::Triangle(t) => Shape::Polygon(polygon_from_geo(&t.to_polygon())),
            G::GeometryCollection(_) => {
                return Err(CityGeoError::invalid_geometry(
                    "GeometryCollection is not supported",
                ))
            }
        };
        Ok(shape)
    }
}

fn from_geo(c: geo::Coord<f64>) -> Coord {
    Coord::xy(c.x, c.y)
}

fn line_from_geo(ls: &geo::LineString<f64>) -> Vec<Coord> {
    ls.coords().map(|c| from_geo(*c)).collect()
}

fn polygon_from_geo(p: &geo::Polygon<f64>) -> Vec<Ring> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(line_from_geo)
        .collect()
}

fn to_geo_line(cs: &[Coord]) -> geo::LineString<f64> {
    geo::LineString::new(cs.iter().map(|c| geo::coord! { x: c.x, y: c.y }).collect())
}

fn to_geo_polygon(rings: &[Ring]) -> geo::Polygon<f64> {
    let mut iter = rings.iter().map(|r| to_geo_line(r));
    let exterior = iter.next().unwrap_or_else(|| geo::LineString::new(Vec::new()));
    geo::Polygon::new(exterior, iter.collect())
}

impl Shape {
    /// Convertit en géométrie `geo` (l'altitude est perdue)
    pub fn to_geo(&self) -> geo::Geometry<f64> {
        use geo::Geometry as G;

        match self {
            Shape::Point(c) => G::Point(geo::Point::new(c.x, c.y)),
            Shape::LineString(cs) => G::LineString(to_geo_line(cs)),
            Shape::Polygon(rings) => G::Polygon(to_geo_polygon(rings)),
            Shape::MultiPoint(cs) => G::MultiPoint(geo::MultiPoint::new(
                cs.iter().map(|c| geo::Point::new(c.x, c.y)).collect(),
            )),
            Shape::MultiLineString(lines) => G::MultiLineString(geo::MultiLineString::new(
                lines.iter().map(|l| to_geo_line(l)).collect(),
            )),
            Shape::MultiPolygon(polys) => G::MultiPolygon(geo::MultiPolygon::new(
                polys.iter().map(|p| to_geo_polygon(p)).collect(),
            )),
        }
    }
}

fn from_position(pos: &[f64]) -> Result<Coord> {
    match pos {
        [x, y] => Ok(Coord::xy(*x, *y)),
        [x, y, z, ..] => Ok(Coord::xyz(*x, *y, *z)),
        _ => Err(CityGeoError::invalid_geometry(format!(
            "position with {} values",
            pos.len()
        ))),
    }
}

fn positions(list: &[Vec<f64>]) -> Result<Vec<Coord>> {
    list.iter().map(|p| from_position(p)).collect()
}

fn nested_positions(list: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Coord>>> {
    list.iter().map(|r| positions(r)).collect()
}

impl TryFrom<&geojson::Geometry> for Shape {
    type Error = CityGeoError;

    /// Les positions à 3 valeurs ou plus conservent leur altitude
    fn try_from(geom: &geojson::Geometry) -> Result<Self> {
        use geojson::Value as V;

        let shape = match &geom.value {
            V::Point(p) => Shape::Point(from_position(p)?),
            V::MultiPoint(ps) => Shape::MultiPoint(positions(ps)?),
            V::LineString(ps) => Shape::LineString(positions(ps)?),
            V::MultiLineString(ls) => Shape::MultiLineString(nested_positions(ls)?),
            V::Polygon(rings) => Shape::Polygon(nested_positions(rings)?),
            V::MultiPolygon(polys) => Shape::MultiPolygon(
                polys
                    .iter()
                    .map(|p| nested_positions(p))
                    .collect::<Result<_>>()?,
            ),
            V::GeometryCollection(_) => {
                return Err(CityGeoError::invalid_geometry(
                    "GeometryCollection is not supported",
                ))
            }
        };
        Ok(shape)
    }
}

impl GeozeroGeometry for Shape {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> GeozeroResult<()> {
        match self {
            Shape::Point(c) => {
                processor.point_begin(0)?;
                emit_coord(processor, c, 0)?;
                processor.point_end(0)
            }
            Shape::LineString(cs) => emit_line(processor, cs, true, 0),
            Shape::Polygon(rings) => emit_polygon(processor, rings, true, 0),
            Shape::MultiPoint(cs) => {
                processor.multipoint_begin(cs.len(), 0)?;
                for (i, c) in cs.iter().enumerate() {
                    emit_coord(processor, c, i)?;
                }
                processor.multipoint_end(0)
            }
            Shape::MultiLineString(lines) => {
                processor.multilinestring_begin(lines.len(), 0)?;
                for (i, line) in lines.iter().enumerate() {
                    emit_line(processor, line, false, i)?;
                }
                processor.multilinestring_end(0)
            }
            Shape::MultiPolygon(polys) => {
                processor.multipolygon_begin(polys.len(), 0)?;
                for (i, rings) in polys.iter().enumerate() {
                    emit_polygon(processor, rings, false, i)?;
                }
                processor.multipolygon_end(0)
            }
        }
    }

    fn dims(&self) -> CoordDimensions {
        if self.has_z() {
            CoordDimensions::xyz()
        } else {
            CoordDimensions::xy()
        }
    }
}

fn emit_coord<P: GeomProcessor>(processor: &mut P, c: &Coord, idx: usize) -> GeozeroResult<()> {
    if processor.multi_dim() {
        processor.coordinate(c.x, c.y, c.z, None, None, None, idx)
    } else {
        processor.xy(c.x, c.y, idx)
    }
}

fn emit_line<P: GeomProcessor>(
    processor: &mut P,
    cs: &[Coord],
    tagged: bool,
    idx: usize,
) -> GeozeroResult<()> {
    processor.linestring_begin(tagged, cs.len(), idx)?;
    for (i, c) in cs.iter().enumerate() {
        emit_coord(processor, c, i)?;
    }
    processor.linestring_end(tagged, idx)
}

fn emit_polygon<P: GeomProcessor>(
    processor: &mut P,
    rings: &[Ring],
    tagged: bool,
    idx: usize,
) -> GeozeroResult<()> {
    processor.polygon_begin(tagged, rings.len(), idx)?;
    for (i, ring) in rings.iter().enumerate() {
        emit_line(processor, ring, false, i)?;
    }
    processor.polygon_end(tagged, idx)
}
