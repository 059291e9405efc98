//! Lecture d'une FeatureCollection GeoJSON en dataset
//!
//! Les propriétés retenues sont déclarées par le pipeline (clés comparées
//! en minuscules) ; la géométrie est placée dans la colonne brute `geometry`.

use std::path::Path;

use citygeo::{Dataset, FieldDef, FieldKind, Schema, Shape, Value, RAW_GEOMETRY_COLUMN};
use geojson::{FeatureCollection, GeoJson};
use tracing::{info, warn};

use super::record::json_value;
use crate::error::{FetchError, Result};

/// Lit un fichier GeoJSON téléchargé
pub fn read_feature_collection(path: &Path, fields: &[FieldDef]) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(FetchError::from)?;
    parse_feature_collection(&text, &path.display().to_string(), fields)
}

/// Construit un dataset depuis le texte d'une FeatureCollection
pub fn parse_feature_collection(text: &str, origin: &str, fields: &[FieldDef]) -> Result<Dataset> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| FetchError::payload(origin, e.to_string()))?;
    let collection = FeatureCollection::try_from(geojson)
        .map_err(|e| FetchError::payload(origin, e.to_string()))?;

    let mut defs = fields.to_vec();
    defs.push(FieldDef::new(RAW_GEOMETRY_COLUMN, FieldKind::Shape));
    let mut dataset = Dataset::new(Schema::new(defs)?);

    let mut invalid = 0usize;
    let mut seen = vec![false; fields.len()];
    for (idx, feature) in collection.features.iter().enumerate() {
        let mut row = Vec::with_capacity(fields.len() + 1);
        for (field, seen) in fields.iter().zip(seen.iter_mut()) {
            let property = feature.properties.as_ref().and_then(|props| {
                props
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == field.name)
                    .map(|(_, v)| v)
            });
            *seen |= property.is_some();
            row.push(property.map_or(Value::Null, |v| json_value(v, field.kind)));
        }

        let shape = match feature.geometry.as_ref().map(Shape::try_from) {
            Some(Ok(shape)) => Value::Shape(shape),
            Some(Err(e)) => {
                warn!(feature = idx, error = %e, "Unreadable feature geometry");
                invalid += 1;
                Value::Null
            }
            None => Value::Null,
        };
        row.push(shape);
        dataset.push(row)?;
    }

    warn_unseen(origin, fields, &seen, dataset.len());
    info!(
        origin = %origin,
        features = dataset.len(),
        invalid,
        "FeatureCollection read"
    );
    Ok(dataset)
}

/// Avertit pour chaque champ déclaré absent de toutes les entités
pub(crate) fn warn_unseen(origin: &str, fields: &[FieldDef], seen: &[bool], records: usize) {
    if records == 0 {
        return;
    }
    for (field, _) in fields.iter().zip(seen).filter(|(_, seen)| !**seen) {
        warn!(origin = %origin, field = %field.name, "Declared field absent from source");
    }
}
