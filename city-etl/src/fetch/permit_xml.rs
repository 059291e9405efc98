//! Permis de construire publiés en XML
//!
//! Un élément par permis sous la racine. Un permis peut couvrir plusieurs
//! parcelles (`地段地號`) : chaque parcelle donne un enregistrement, les
//! autres champs du permis étant recopiés. Un permis sans parcelle ne
//! produit aucun enregistrement.

use std::path::Path;

use roxmltree::{Document, Node};
use serde_json::Value as Json;
use tracing::{info, warn};

use super::data_taipei::Record;
use crate::error::FetchError;

/// Liste des parcelles d'un permis
pub const LAND_UNITS_TAG: &str = "地段地號";
/// Adresses du bâtiment ; seule la première est retenue
pub const ADDRESS_TAG: &str = "建築地點";
/// Groupes dont les sous-éléments deviennent des champs
const NESTED_TAGS: &[&str] = &["建物資訊", "建物面積"];

/// Lit un fichier XML téléchargé
pub fn read_permits(path: &Path) -> Result<Vec<Record>, FetchError> {
    let text = std::fs::read_to_string(path)?;
    parse_permits(&text, &path.display().to_string())
}

/// Un enregistrement par parcelle de chaque permis
pub fn parse_permits(text: &str, origin: &str) -> Result<Vec<Record>, FetchError> {
    let doc = Document::parse(text).map_err(|e| FetchError::payload(origin, e.to_string()))?;

    let mut records = Vec::new();
    let mut permits = 0usize;
    let mut without_units = 0usize;
    for permit in elements(doc.root_element()) {
        permits += 1;
        let base = permit_fields(permit);
        let units: Vec<Json> = elements(permit)
            .find(|c| c.tag_name().name() == LAND_UNITS_TAG)
            .map(|list| elements(list).map(|u| json_text(u)).collect())
            .unwrap_or_default();

        if units.is_empty() {
            without_units += 1;
            continue;
        }
        for unit in units {
            let mut record = base.clone();
            record.insert(LAND_UNITS_TAG.to_string(), unit);
            records.push(record);
        }
    }

    if without_units > 0 {
        warn!(origin = %origin, permits = without_units, "Skipping permits without land units");
    }
    info!(origin = %origin, permits, records = records.len(), "Permits read");
    Ok(records)
}

/// Champs d'un permis, hors parcelles
fn permit_fields(permit: Node<'_, '_>) -> Record {
    let mut record = Record::new();
    for column in elements(permit) {
        let name = column.tag_name();
        let tag = name.name();
        match tag {
            LAND_UNITS_TAG => {}
            ADDRESS_TAG => {
                let first = elements(column).next().map_or(Json::Null, json_text);
                record.insert(tag.to_string(), first);
            }
            _ if NESTED_TAGS.contains(&tag) => {
                for item in elements(column) {
                    record.insert(item.tag_name().name().to_string(), json_text(item));
                }
            }
            _ => {
                record.insert(tag.to_string(), json_text(column));
            }
        }
    }
    record
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// Texte d'un élément ; vide -> Null
fn json_text(node: Node<'_, '_>) -> Json {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or(Json::Null, |t| Json::String(t.to_string()))
}
