//! Projection Web Mercator (EPSG:3857)
//!
//! Modèle sphérique sur le rayon équatorial WGS84.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::ellipsoid::WGS84;
use super::Geographic;

/// Latitude maximale représentable
const MAX_LAT_DEG: f64 = 85.06;

/// Géographique -> Web Mercator
pub fn to_web_mercator(geo: Geographic) -> (f64, f64) {
    let r = WGS84.a;
    let lat = geo
        .lat
        .clamp(-MAX_LAT_DEG.to_radians(), MAX_LAT_DEG.to_radians());

    let x = r * geo.lon;
    let y = r * (FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

/// Web Mercator -> géographique
pub fn from_web_mercator(x: f64, y: f64) -> Geographic {
    let r = WGS84.a;
    let lon = x / r;
    let lat = 2.0 * (y / r).exp().atan() - FRAC_PI_2;
    Geographic::new(lon, lat)
}
