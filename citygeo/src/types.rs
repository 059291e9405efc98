//! Types géométriques du crate citygeo
//!
//! `Shape` est la géométrie brute telle que fournie par une source (2D ou 3D,
//! simple ou multiple). `CanonicalGeometry` est la forme publiée : EWKB
//! étiqueté par un SRID et un contrat `GeometryType`.

use std::fmt;
use std::str::FromStr;

use crate::error::{CityGeoError, Result};

/// Contrat de type de géométrie d'une table (liste fermée)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    LineStringZ,
    MultiLineStringZ,
}

impl GeometryType {
    /// Toutes les valeurs acceptées
    pub const ALL: [GeometryType; 8] = [
        Self::Point,
        Self::LineString,
        Self::Polygon,
        Self::MultiPoint,
        Self::MultiLineString,
        Self::MultiPolygon,
        Self::LineStringZ,
        Self::MultiLineStringZ,
    ];

    /// Nom PostGIS du type (utilisé dans `geometry(<Type>, 4326)`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::LineStringZ => "LineStringZ",
            Self::MultiLineStringZ => "MultiLineStringZ",
        }
    }

    /// Le contrat impose-t-il une coordonnée z
    pub fn has_z(self) -> bool {
        matches!(self, Self::LineStringZ | Self::MultiLineStringZ)
    }

    /// Famille de forme attendue par le contrat
    pub fn kind(self) -> ShapeKind {
        match self {
            Self::Point => ShapeKind::Point,
            Self::LineString | Self::LineStringZ => ShapeKind::LineString,
            Self::Polygon => ShapeKind::Polygon,
            Self::MultiPoint => ShapeKind::MultiPoint,
            Self::MultiLineString | Self::MultiLineStringZ => ShapeKind::MultiLineString,
            Self::MultiPolygon => ShapeKind::MultiPolygon,
        }
    }
}

impl FromStr for GeometryType {
    type Err = CityGeoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CityGeoError::UnknownGeometryType(s.to_string()))
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Famille d'une géométrie brute, indépendamment de sa dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

/// Coordonnée avec altitude optionnelle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Vérifie que x, y (et z si présent) sont finis
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// Anneau ou ligne : suite ordonnée de coordonnées
pub type Ring = Vec<Coord>;

/// Géométrie brute d'un enregistrement source
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Anneau extérieur puis intérieurs
    Polygon(Vec<Ring>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Shape {
    /// Famille de la géométrie
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Point(_) => ShapeKind::Point,
            Self::LineString(_) => ShapeKind::LineString,
            Self::Polygon(_) => ShapeKind::Polygon,
            Self::MultiPoint(_) => ShapeKind::MultiPoint,
            Self::MultiLineString(_) => ShapeKind::MultiLineString,
            Self::MultiPolygon(_) => ShapeKind::MultiPolygon,
        }
    }

    /// Itère sur toutes les coordonnées, dans l'ordre
    pub fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Self::Point(c) => Box::new(std::iter::once(c)),
            Self::LineString(cs) | Self::MultiPoint(cs) => Box::new(cs.iter()),
            Self::Polygon(rings) | Self::MultiLineString(rings) => {
                Box::new(rings.iter().flatten())
            }
            Self::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten()),
        }
    }

    /// Au moins une coordonnée porte une altitude
    pub fn has_z(&self) -> bool {
        self.coords().any(|c| c.z.is_some())
    }

    /// Aucune coordonnée
    pub fn is_empty(&self) -> bool {
        self.coords().next().is_none()
    }

    /// Applique une transformation fallible à chaque coordonnée
    pub fn try_map_coords<F>(&self, mut f: F) -> Result<Shape>
    where
        F: FnMut(&Coord) -> Result<Coord>,
    {
        let shape = match self {
            Self::Point(c) => Self::Point(f(c)?),
            Self::LineString(cs) => Self::LineString(map_ring(cs, &mut f)?),
            Self::MultiPoint(cs) => Self::MultiPoint(map_ring(cs, &mut f)?),
            Self::Polygon(rings) => Self::Polygon(map_rings(rings, &mut f)?),
            Self::MultiLineString(lines) => Self::MultiLineString(map_rings(lines, &mut f)?),
            Self::MultiPolygon(polys) => {
                let mut out = Vec::with_capacity(polys.len());
                for rings in polys {
                    out.push(map_rings(rings, &mut f)?);
                }
                Self::MultiPolygon(out)
            }
        };
        Ok(shape)
    }

    /// Applique une transformation à chaque coordonnée
    pub fn map_coords<F>(&self, mut f: F) -> Shape
    where
        F: FnMut(&Coord) -> Coord,
    {
        let mut line = |cs: &[Coord]| cs.iter().map(&mut f).collect::<Vec<_>>();
        match self {
            Self::Point(c) => Self::Point(f(c)),
            Self::LineString(cs) => Self::LineString(line(cs)),
            Self::MultiPoint(cs) => Self::MultiPoint(line(cs)),
            Self::Polygon(rings) => Self::Polygon(rings.iter().map(|r| line(r)).collect()),
            Self::MultiLineString(lines) => {
                Self::MultiLineString(lines.iter().map(|l| line(l)).collect())
            }
            Self::MultiPolygon(polys) => Self::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(|r| line(r)).collect())
                    .collect(),
            ),
        }
    }

    /// Retire l'altitude de toutes les coordonnées
    pub fn to_2d(&self) -> Shape {
        self.map_coords(|c| Coord::xy(c.x, c.y))
    }

    /// Complète les altitudes manquantes avec 0
    pub fn with_z_filled(&self) -> Shape {
        self.map_coords(|c| Coord::xyz(c.x, c.y, c.z.unwrap_or(0.0)))
    }

    /// Vérifie qu'une géométrie est acceptable par PostGIS
    ///
    /// Les anneaux doivent être fermés et avoir au moins 4 points,
    /// les lignes au moins 2 points.
    pub fn is_valid_for_postgis(&self) -> bool {
        fn ring_ok(ring: &[Coord]) -> bool {
            ring.len() >= 4
                && ring
                    .first()
                    .zip(ring.last())
                    .is_some_and(|(a, b)| a.x == b.x && a.y == b.y)
        }
        fn polygon_ok(rings: &[Ring]) -> bool {
            !rings.is_empty() && rings.iter().all(|r| ring_ok(r))
        }

        if !self.coords().all(Coord::is_finite) {
            return false;
        }
        match self {
            Self::Point(_) => true,
            Self::MultiPoint(cs) => !cs.is_empty(),
            Self::LineString(cs) => cs.len() >= 2,
            Self::MultiLineString(lines) => {
                !lines.is_empty() && lines.iter().all(|l| l.len() >= 2)
            }
            Self::Polygon(rings) => polygon_ok(rings),
            Self::MultiPolygon(polys) => !polys.is_empty() && polys.iter().all(|p| polygon_ok(p)),
        }
    }
}

fn map_ring<F>(ring: &[Coord], f: &mut F) -> Result<Vec<Coord>>
where
    F: FnMut(&Coord) -> Result<Coord>,
{
    let mut out = Vec::with_capacity(ring.len());
    for c in ring {
        out.push(f(c)?);
    }
    Ok(out)
}

fn map_rings<F>(rings: &[Ring], f: &mut F) -> Result<Vec<Ring>>
where
    F: FnMut(&Coord) -> Result<Coord>,
{
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(map_ring(ring, f)?);
    }
    Ok(out)
}

/// Géométrie canonique prête à être publiée
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGeometry {
    /// Contrat de type déclaré
    pub geometry_type: GeometryType,
    /// SRID embarqué dans l'EWKB
    pub srid: u32,
    /// Octets EWKB
    pub ewkb: Vec<u8>,
}

impl CanonicalGeometry {
    /// EWKB en hexadécimal majuscule (entrée texte PostGIS)
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.ewkb)
    }
}
