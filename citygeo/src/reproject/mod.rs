//! Reprojection des géométries brutes
//!
//! Le moteur léger (Rust pur) couvre les systèmes utilisés par les sources
//! de Taipei. Avec la feature `reproject`, les autres couples EPSG sont
//! délégués à PROJ.

mod ellipsoid;
mod lite;
mod mercator;
#[cfg(feature = "reproject")]
mod proj;
mod tm;

pub use ellipsoid::{Ellipsoid, GRS80, WGS84};
pub use lite::{Crs, LiteReprojector};
#[cfg(feature = "reproject")]
pub use self::proj::ProjReprojector;
pub use tm::TransverseMercator;

use crate::error::{CityGeoError, Result};
use crate::types::{Coord, Shape};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(lon_deg.to_radians(), lat_deg.to_radians())
    }
}

/// Reprojection : moteur léger en priorité, PROJ si disponible
pub enum Reprojector {
    /// Reprojection légère (pure Rust)
    Lite(LiteReprojector),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "reproject")]
    Proj(ProjReprojector),
}

impl Reprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if LiteReprojector::is_supported(source_epsg, target_epsg) {
            return Ok(Self::Lite(LiteReprojector::new(source_epsg, target_epsg)?));
        }

        #[cfg(feature = "reproject")]
        return Ok(Self::Proj(ProjReprojector::new(source_epsg, target_epsg)?));

        #[cfg(not(feature = "reproject"))]
        return Err(CityGeoError::UnsupportedProjection {
            from: source_epsg,
            to: target_epsg,
        });
    }

    /// Transforme un point (x, y)
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Self::Lite(lite) => lite.transform_point(x, y),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_point(x, y),
        }
    }

    /// Transforme une coordonnée ; l'altitude est conservée telle quelle
    pub fn transform_coord(&self, c: &Coord) -> Result<Coord> {
        let (x, y) = self.transform_point(c.x, c.y)?;
        Ok(Coord { x, y, z: c.z })
    }

    /// Transforme toutes les coordonnées d'une géométrie
    pub fn transform_shape(&self, shape: &Shape) -> Result<Shape> {
        if shape.is_empty() {
            return Err(CityGeoError::EmptyGeometry);
        }
        shape.try_map_coords(|c| self.transform_coord(c))
    }

    /// Retourne une description du moteur utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}
