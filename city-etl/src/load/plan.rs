//! Plan d'écriture : suite ordonnée d'étapes exécutée atomiquement par un puits

use citygeo::{Dataset, FieldKind, TARGET_SRID};

use super::directive::{LoadBehavior, ValidatedDirective, WriteMode};

/// Colonne d'une table cible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
}

/// Table cible, créée si absente
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Déduit les colonnes SQL du schéma du dataset
    pub fn from_dataset(name: &str, dataset: &Dataset) -> Self {
        let columns = dataset
            .schema()
            .fields()
            .iter()
            .map(|f| ColumnSpec {
                name: f.name.clone(),
                sql_type: sql_type(f.kind),
            })
            .collect();
        Self {
            name: name.to_string(),
            columns,
        }
    }
}

/// Type PostgreSQL d'une colonne
pub fn sql_type(kind: FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".into(),
        FieldKind::Integer => "bigint".into(),
        FieldKind::Float => "double precision".into(),
        FieldKind::Boolean => "boolean".into(),
        FieldKind::Timestamp => "timestamp with time zone".into(),
        FieldKind::Geometry(t) => format!("geometry({}, {})", t.as_str(), TARGET_SRID),
        // jamais planifié : refusé par la validation
        FieldKind::Shape => "bytea".into(),
    }
}

/// Étape d'un plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStep {
    /// Crée la table si elle n'existe pas
    Ensure(TableSpec),
    /// Supprime toutes les lignes
    Truncate(String),
    /// Insère les lignes du dataset
    Insert(String),
}

/// Plan complet pour une sauvegarde
#[derive(Debug)]
pub struct WritePlan<'a> {
    pub behavior: LoadBehavior,
    pub steps: Vec<WriteStep>,
    pub dataset: &'a Dataset,
}

impl<'a> WritePlan<'a> {
    /// Construit les étapes correspondant au mode de chargement
    pub fn build(directive: &ValidatedDirective, dataset: &'a Dataset) -> Self {
        let current = directive.default_table().to_string();
        let mut steps = vec![WriteStep::Ensure(TableSpec::from_dataset(&current, dataset))];

        match directive.mode() {
            WriteMode::Append => {
                steps.push(WriteStep::Insert(current));
            }
            WriteMode::Replace => {
                steps.push(WriteStep::Truncate(current.clone()));
                steps.push(WriteStep::Insert(current));
            }
            WriteMode::CurrentHistory { history } => {
                steps.push(WriteStep::Ensure(TableSpec::from_dataset(history, dataset)));
                steps.push(WriteStep::Truncate(current.clone()));
                steps.push(WriteStep::Insert(current));
                steps.push(WriteStep::Insert(history.clone()));
            }
        }

        Self {
            behavior: directive.behavior(),
            steps,
            dataset,
        }
    }

    /// Tables touchées par le plan, dans l'ordre d'insertion
    pub fn tables(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                WriteStep::Insert(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}
