//! Directive de chargement et sa validation
//!
//! La directive arrive sous forme de valeurs brutes (preset JSON, CLI) et
//! n'est utilisable qu'une fois validée : toute incohérence est une erreur
//! de configuration levée avant le premier appel au puits.

use std::fmt;
use std::str::FromStr;

use citygeo::{GeometryType, CANONICAL_COLUMN};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Stratégie d'écriture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Ajout aux lignes existantes
    Append,
    /// Vidage puis insertion
    Replace,
    /// Vidage + insertion dans la table courante, ajout dans l'historique
    CurrentHistory,
}

impl LoadBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Replace => "replace",
            Self::CurrentHistory => "current+history",
        }
    }
}

impl FromStr for LoadBehavior {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            "current+history" => Ok(Self::CurrentHistory),
            other => Err(ConfigError::UnknownLoadBehavior(other.to_string())),
        }
    }
}

impl fmt::Display for LoadBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directive brute, telle que déclarée par un pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDirective {
    pub load_behavior: String,
    pub default_table: String,
    #[serde(default)]
    pub history_table: Option<String>,
    #[serde(default)]
    pub geometry_column: Option<String>,
    #[serde(default)]
    pub geometry_type: Option<String>,
}

impl LoadDirective {
    pub fn new(load_behavior: &str, default_table: &str) -> Self {
        Self {
            load_behavior: load_behavior.to_string(),
            default_table: default_table.to_string(),
            history_table: None,
            geometry_column: None,
            geometry_type: None,
        }
    }

    pub fn with_history(mut self, history_table: &str) -> Self {
        self.history_table = Some(history_table.to_string());
        self
    }

    pub fn with_geometry_type(mut self, geometry_type: &str) -> Self {
        self.geometry_type = Some(geometry_type.to_string());
        self
    }

    pub fn with_geometry_column(mut self, column: &str) -> Self {
        self.geometry_column = Some(column.to_string());
        self
    }

    /// Valide les champs communs aux deux chemins d'écriture
    pub fn validate(&self) -> Result<ValidatedDirective, ConfigError> {
        let behavior: LoadBehavior = self.load_behavior.parse()?;
        let default_table = validate_identifier(&self.default_table)?;

        let mode = match behavior {
            LoadBehavior::Append => WriteMode::Append,
            LoadBehavior::Replace => WriteMode::Replace,
            LoadBehavior::CurrentHistory => {
                let history = self
                    .history_table
                    .as_deref()
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or(ConfigError::MissingHistoryTable)?;
                let history = validate_identifier(history)?;
                if history == default_table {
                    return Err(ConfigError::SameHistoryTable(history));
                }
                WriteMode::CurrentHistory { history }
            }
        };

        Ok(ValidatedDirective {
            mode,
            default_table,
        })
    }

    /// Valide le contrat géométrique du chemin géographique
    pub fn validate_geometry(&self) -> Result<GeometryTarget, ConfigError> {
        let raw = self
            .geometry_type
            .as_deref()
            .ok_or(ConfigError::MissingGeometryType)?;
        let geometry_type = raw
            .parse::<GeometryType>()
            .map_err(|_| ConfigError::InvalidGeometryType(raw.to_string()))?;
        let column = self
            .geometry_column
            .as_deref()
            .unwrap_or(CANONICAL_COLUMN)
            .to_lowercase();
        Ok(GeometryTarget {
            column,
            geometry_type,
        })
    }
}

/// Mode d'écriture validé
///
/// La table d'historique n'existe qu'en current+history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    Replace,
    CurrentHistory { history: String },
}

impl WriteMode {
    pub fn behavior(&self) -> LoadBehavior {
        match self {
            Self::Append => LoadBehavior::Append,
            Self::Replace => LoadBehavior::Replace,
            Self::CurrentHistory { .. } => LoadBehavior::CurrentHistory,
        }
    }
}

/// Directive validée, construite uniquement par `LoadDirective::validate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDirective {
    mode: WriteMode,
    default_table: String,
}

impl ValidatedDirective {
    pub fn mode(&self) -> &WriteMode {
        &self.mode
    }

    pub fn behavior(&self) -> LoadBehavior {
        self.mode.behavior()
    }

    pub fn default_table(&self) -> &str {
        &self.default_table
    }

    pub fn history_table(&self) -> Option<&str> {
        match &self.mode {
            WriteMode::CurrentHistory { history } => Some(history),
            WriteMode::Append | WriteMode::Replace => None,
        }
    }
}

/// Colonne géométrique désignée et son contrat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryTarget {
    pub column: String,
    pub geometry_type: GeometryType,
}

/// Vérifie un identifiant de table (`table` ou `schema.table`, minuscules)
pub fn validate_identifier(name: &str) -> Result<String, ConfigError> {
    let name = name.trim();
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(ConfigError::InvalidIdentifier(name.to_string()));
    }
    Ok(name.to_string())
}
