//! Reprojection légère en Rust pur
//!
//! Systèmes supportés, dans les deux sens, via un pivot géographique :
//! - WGS84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//! - TWD97 / TM2 zone 121 (EPSG:3826) - Taïwan
//! - TWD97 / TM2 zone 119 (EPSG:3825) - Penghu, Kinmen

use super::mercator;
use super::tm::TransverseMercator;
use super::Geographic;
use crate::error::{CityGeoError, Result};

/// Système de coordonnées connu du moteur léger
#[derive(Debug, Clone, Copy)]
pub enum Crs {
    Wgs84,
    WebMercator,
    Tm(TransverseMercator),
}

impl Crs {
    /// Résout un code EPSG
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Wgs84),
            3857 => Some(Self::WebMercator),
            3826 => Some(Self::Tm(TransverseMercator::twd97_tm2(121.0))),
            3825 => Some(Self::Tm(TransverseMercator::twd97_tm2(119.0))),
            _ => None,
        }
    }

    fn to_geographic(self, x: f64, y: f64) -> Geographic {
        match self {
            Self::Wgs84 => Geographic::from_degrees(x, y),
            Self::WebMercator => mercator::from_web_mercator(x, y),
            Self::Tm(tm) => tm.inverse(x, y),
        }
    }

    fn project(self, geo: Geographic) -> (f64, f64) {
        match self {
            Self::Wgs84 => geo.to_degrees(),
            Self::WebMercator => mercator::to_web_mercator(geo),
            Self::Tm(tm) => tm.forward(geo),
        }
    }
}

/// Reprojection légère entre deux EPSG
#[derive(Debug, Clone, Copy)]
pub struct LiteReprojector {
    source: Crs,
    target: Crs,
}

impl LiteReprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        match (Crs::from_epsg(source_epsg), Crs::from_epsg(target_epsg)) {
            (Some(source), Some(target)) => Ok(Self { source, target }),
            _ => Err(CityGeoError::UnsupportedProjection {
                from: source_epsg,
                to: target_epsg,
            }),
        }
    }

    /// Vérifie si le couple est supporté
    pub fn is_supported(source_epsg: u32, target_epsg: u32) -> bool {
        Crs::from_epsg(source_epsg).is_some() && Crs::from_epsg(target_epsg).is_some()
    }

    /// Transforme un point : source -> géographique -> cible
    ///
    /// Même lorsque source et cible sont identiques, le point passe par le pivot.
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(CityGeoError::NonFiniteCoordinate { x, y });
        }
        let geo = self.source.to_geographic(x, y);
        let (tx, ty) = self.target.project(geo);
        if !tx.is_finite() || !ty.is_finite() {
            return Err(CityGeoError::Projection(format!(
                "({x}, {y}) has no finite image"
            )));
        }
        Ok((tx, ty))
    }
}
