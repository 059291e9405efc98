//! Reprojection via PROJ (feature `reproject`)

use ::proj::Proj;

use crate::error::{CityGeoError, Result};

/// Reprojection entre deux EPSG quelconques, déléguée à PROJ
pub struct ProjReprojector {
    proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

impl ProjReprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);
        let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
            CityGeoError::Projection(format!("{} -> {}: {}", source, target, e))
        })?;
        Ok(Self {
            proj,
            source_epsg,
            target_epsg,
        })
    }

    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(CityGeoError::NonFiniteCoordinate { x, y });
        }
        self.proj.convert((x, y)).map_err(|e| {
            CityGeoError::Projection(format!(
                "EPSG:{} -> EPSG:{}: {}",
                self.source_epsg, self.target_epsg, e
            ))
        })
    }
}
