//! Encodage canonique : EWKB étiqueté par le SRID cible
//!
//! Les dimensions suivent le contrat : xyz pour les contrats Z (altitude
//! manquante encodée à 0), xy sinon.

use geozero::{CoordDimensions, ToWkb};

use crate::error::{CityGeoError, Result};
use crate::types::{CanonicalGeometry, GeometryType, Shape};

/// Encode une géométrie finalisée en EWKB
///
/// Échoue si la famille ne correspond pas au contrat ou si la géométrie
/// n'est pas acceptable par PostGIS.
pub fn encode(shape: &Shape, contract: GeometryType, srid: u32) -> Result<CanonicalGeometry> {
    if shape.kind() != contract.kind() {
        return Err(CityGeoError::ContractMismatch {
            expected: contract,
            found: shape.kind(),
        });
    }
    if shape.is_empty() {
        return Err(CityGeoError::EmptyGeometry);
    }
    if !shape.is_valid_for_postgis() {
        return Err(CityGeoError::invalid_geometry(format!(
            "{} rejected by PostGIS rules",
            shape.kind()
        )));
    }

    let (shape, dims) = if contract.has_z() {
        (shape.with_z_filled(), CoordDimensions::xyz())
    } else {
        (shape.to_2d(), CoordDimensions::xy())
    };
    let ewkb = shape.to_ewkb(dims, Some(srid as i32))?;

    Ok(CanonicalGeometry {
        geometry_type: contract,
        srid,
        ewkb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    const EWKB_Z: u32 = 0x8000_0000;
    const EWKB_SRID: u32 = 0x2000_0000;

    fn header(ewkb: &[u8]) -> (u32, u32) {
        assert_eq!(ewkb[0], 1, "little endian");
        let ty = u32::from_le_bytes([ewkb[1], ewkb[2], ewkb[3], ewkb[4]]);
        let srid = u32::from_le_bytes([ewkb[5], ewkb[6], ewkb[7], ewkb[8]]);
        (ty, srid)
    }

    #[test]
    fn test_point_header() {
        let g = encode(&Shape::Point(Coord::xy(121.5, 25.0)), GeometryType::Point, 4326).unwrap();
        let (ty, srid) = header(&g.ewkb);
        assert_eq!(ty, 1 | EWKB_SRID);
        assert_eq!(srid, 4326);
        // en-tête (9 octets) + x, y
        assert_eq!(g.ewkb.len(), 9 + 16);
        assert!(g.to_hex().starts_with("0101000020E6100000"));
    }

    #[test]
    fn test_z_contract_fills_elevation() {
        let line = Shape::MultiLineString(vec![vec![
            Coord::xy(121.5, 25.0),
            Coord::xyz(121.6, 25.1, 7.0),
        ]]);
        let g = encode(&line, GeometryType::MultiLineStringZ, 4326).unwrap();
        let (ty, _) = header(&g.ewkb);
        assert_eq!(ty, 5 | EWKB_SRID | EWKB_Z);
    }

    #[test]
    fn test_2d_contract_strips_elevation() {
        let line = Shape::LineString(vec![
            Coord::xyz(121.5, 25.0, 1.0),
            Coord::xyz(121.6, 25.1, 2.0),
        ]);
        let g = encode(&line, GeometryType::LineString, 4326).unwrap();
        let (ty, _) = header(&g.ewkb);
        assert_eq!(ty, 2 | EWKB_SRID);
    }

    #[test]
    fn test_contract_mismatch() {
        let err = encode(
            &Shape::Point(Coord::xy(0.0, 0.0)),
            GeometryType::MultiPolygon,
            4326,
        )
        .unwrap_err();
        assert!(matches!(err, CityGeoError::ContractMismatch { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        let err = encode(&Shape::MultiPolygon(vec![]), GeometryType::MultiPolygon, 4326)
            .unwrap_err();
        assert!(matches!(err, CityGeoError::EmptyGeometry));
    }
}
