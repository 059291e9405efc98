//! Dataset tabulaire transitoire : schéma explicite + lignes ordonnées
//!
//! Un dataset est reconstruit à chaque exécution. Le schéma est déclaré
//! par le pipeline (pas d'inférence de colonnes à l'exécution).

use std::fmt;

use chrono::{DateTime, FixedOffset};
use tracing::warn;

use crate::error::{CityGeoError, Result};
use crate::types::{CanonicalGeometry, GeometryType, Shape};

/// Valeur d'une cellule
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<FixedOffset>),
    /// Géométrie brute, avant normalisation
    Shape(Shape),
    /// Géométrie canonique (EWKB)
    Geometry(CanonicalGeometry),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Nom court du variant, pour les messages d'erreur
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::Shape(_) => "shape",
            Self::Geometry(_) => "geometry",
        }
    }

    /// Coercition numérique : nombre, ou texte parsable en flottant
    ///
    /// Renvoie `None` pour toute autre valeur et pour les valeurs non finies.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Self::Integer(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Type déclaré d'une colonne
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Géométrie brute (colonne `geometry` avant normalisation)
    Shape,
    /// Géométrie canonique avec son contrat
    Geometry(GeometryType),
}

impl FieldKind {
    /// La valeur est-elle compatible avec ce type (Null l'est toujours)
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_) | Value::Integer(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Shape, Value::Shape(_)) => true,
            (Self::Geometry(_), Value::Geometry(_)) => true,
            _ => false,
        }
    }

    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Shape | Self::Geometry(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::Shape => f.write_str("shape"),
            Self::Geometry(t) => write!(f, "geometry({t})"),
        }
    }
}

/// Définition d'une colonne
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    /// Crée une colonne ; le nom est mis en minuscules
    pub fn new(name: impl AsRef<str>, kind: FieldKind) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            kind,
        }
    }
}

/// Schéma ordonné d'un dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Construit un schéma, en rejetant les noms dupliqués
    pub fn new(fields: Vec<FieldDef>) -> Result<Self> {
        let mut schema = Self::default();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    fn push(&mut self, field: FieldDef) -> Result<()> {
        if self.index_of(&field.name).is_some() {
            return Err(CityGeoError::DuplicateColumn(field.name));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position d'une colonne (nom insensible à la casse)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Ligne de valeurs alignée sur le schéma
pub type Row = Vec<Value>;

/// Dataset : schéma + lignes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ajoute une ligne positionnelle, vérifiée contre le schéma
    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(CityGeoError::RowWidth {
                expected: self.schema.len(),
                found: row.len(),
            });
        }
        for (field, value) in self.schema.fields.iter().zip(&row) {
            check_kind(field, value)?;
        }
        self.rows.push(row);
        Ok(())
    }

    /// Ajoute une ligne nommée ; les colonnes absentes valent Null
    pub fn push_named<K, V, I>(&mut self, values: I) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = vec![Value::Null; self.schema.len()];
        for (name, value) in values {
            let idx = self
                .schema
                .index_of(name.as_ref())
                .ok_or_else(|| CityGeoError::missing_column(name.as_ref()))?;
            row[idx] = value.into();
        }
        self.push(row)
    }

    /// Valeur d'une cellule par nom de colonne
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Itère sur les valeurs d'une colonne
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| CityGeoError::missing_column(name))?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Remplace ou ajoute une colonne avec ses valeurs
    pub fn set_column(&mut self, field: FieldDef, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(CityGeoError::RowWidth {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        for value in &values {
            check_kind(&field, value)?;
        }
        match self.schema.index_of(&field.name) {
            Some(idx) => {
                self.schema.fields[idx] = field;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.schema.push(field)?;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Transforme une colonne en place, en changeant éventuellement son type
    pub fn map_column<F>(&mut self, name: &str, kind: FieldKind, mut f: F) -> Result<()>
    where
        F: FnMut(Value) -> Value,
    {
        let values: Vec<Value> = self
            .take_column(name)?
            .into_iter()
            .map(&mut f)
            .collect();
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| CityGeoError::missing_column(name))?;
        let field = FieldDef::new(&self.schema.fields[idx].name, kind);
        self.set_column(field, values)
    }

    /// Extrait les valeurs d'une colonne en les remplaçant par Null
    pub fn take_column(&mut self, name: &str) -> Result<Vec<Value>> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| CityGeoError::missing_column(name))?;
        Ok(self
            .rows
            .iter_mut()
            .map(|r| std::mem::replace(&mut r[idx], Value::Null))
            .collect())
    }

    /// Supprime une colonne et renvoie ses valeurs
    pub fn drop_column(&mut self, name: &str) -> Result<Vec<Value>> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| CityGeoError::missing_column(name))?;
        self.schema.fields.remove(idx);
        Ok(self.rows.iter_mut().map(|r| r.remove(idx)).collect())
    }

    /// Renomme des colonnes (ancien -> nouveau) ; les noms absents sont ignorés
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) -> Result<()> {
        let mut fields = self.schema.fields.clone();
        for (from, to) in mapping {
            if let Some(idx) = self.schema.index_of(from) {
                fields[idx] = FieldDef::new(to, fields[idx].kind);
            }
        }
        self.schema = Schema::new(fields)?;
        Ok(())
    }

    /// Garde les colonnes listées, dans l'ordre donné
    pub fn select(&self, columns: &[&str]) -> Result<Dataset> {
        let indices = columns
            .iter()
            .map(|c| {
                self.schema
                    .index_of(c)
                    .ok_or_else(|| CityGeoError::missing_column(*c))
            })
            .collect::<Result<Vec<_>>>()?;
        let schema = Schema::new(
            indices
                .iter()
                .map(|&i| self.schema.fields[i].clone())
                .collect(),
        )?;
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Dataset { schema, rows })
    }

    /// Colonnes du schéma cible absentes du dataset
    pub fn missing_columns<'s>(&self, target: &'s Schema) -> Vec<&'s str> {
        target
            .names()
            .filter(|n| self.schema.index_of(n).is_none())
            .collect()
    }

    /// Projette le dataset sur un schéma cible : colonnes réordonnées,
    /// colonnes absentes remplies de Null (avec avertissement), types vérifiés
    pub fn conform(&self, target: &Schema) -> Result<Dataset> {
        for column in self.missing_columns(target) {
            warn!(column, rows = self.len(), "Declared column missing from source, filled with null");
        }
        let sources: Vec<Option<usize>> =
            target.names().map(|n| self.schema.index_of(n)).collect();
        let mut out = Dataset::new(target.clone());
        for row in &self.rows {
            let new_row = sources
                .iter()
                .map(|src| src.map_or(Value::Null, |i| row[i].clone()))
                .collect();
            out.push(new_row)?;
        }
        Ok(out)
    }

    /// Concatène un autre dataset de même schéma
    pub fn append(&mut self, other: Dataset) -> Result<()> {
        let other = if other.schema == self.schema {
            other
        } else {
            other.conform(&self.schema)?
        };
        self.rows.extend(other.rows);
        Ok(())
    }
}

fn check_kind(field: &FieldDef, value: &Value) -> Result<()> {
    if field.kind.accepts(value) {
        Ok(())
    } else {
        Err(CityGeoError::ValueKind {
            column: field.name.clone(),
            expected: field.kind.to_string(),
            found: value.kind_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let schema = Schema::new(vec![
            FieldDef::new("Name", FieldKind::Text),
            FieldDef::new("lng", FieldKind::Float),
        ])
        .unwrap();
        let mut ds = Dataset::new(schema);
        ds.push_named([("name", Value::from("a")), ("lng", Value::from(1.5))])
            .unwrap();
        ds.push_named([("name", "b")]).unwrap();
        ds
    }

    #[test]
    fn test_names_are_lowercased() {
        let ds = sample();
        assert_eq!(ds.schema().names().collect::<Vec<_>>(), vec!["name", "lng"]);
        assert_eq!(ds.value(0, "NAME"), Some(&Value::from("a")));
        assert_eq!(ds.value(1, "lng"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = Schema::new(vec![
            FieldDef::new("a", FieldKind::Text),
            FieldDef::new("A", FieldKind::Integer),
        ])
        .unwrap_err();
        assert!(matches!(err, CityGeoError::DuplicateColumn(ref n) if n == "a"));
    }

    #[test]
    fn test_kind_checked_on_push() {
        let mut ds = sample();
        let err = ds.push(vec![Value::Integer(1), Value::Null]).unwrap_err();
        assert!(matches!(err, CityGeoError::ValueKind { .. }));
        let err = ds.push(vec![Value::Null]).unwrap_err();
        assert!(matches!(err, CityGeoError::RowWidth { expected: 2, found: 1 }));
    }

    #[test]
    fn test_as_f64_coercion() {
        assert_eq!(Value::from(" 121.5 ").as_f64(), Some(121.5));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("abc").as_f64(), None);
        assert_eq!(Value::from("NaN").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_rename_select_drop() {
        let mut ds = sample();
        ds.rename_columns(&[("name", "title"), ("missing", "x")])
            .unwrap();
        let selected = ds.select(&["lng", "title"]).unwrap();
        assert_eq!(
            selected.schema().names().collect::<Vec<_>>(),
            vec!["lng", "title"]
        );
        let dropped = ds.drop_column("lng").unwrap();
        assert_eq!(dropped, vec![Value::Float(1.5), Value::Null]);
        assert_eq!(ds.schema().len(), 1);
    }

    #[test]
    fn test_conform_fills_null() {
        let ds = sample();
        let target = Schema::new(vec![
            FieldDef::new("lng", FieldKind::Float),
            FieldDef::new("extra", FieldKind::Integer),
        ])
        .unwrap();
        assert_eq!(ds.missing_columns(&target), vec!["extra"]);
        let out = ds.conform(&target).unwrap();
        assert_eq!(out.rows()[0], vec![Value::Float(1.5), Value::Null]);
    }

    #[test]
    fn test_missing_columns_empty_when_complete() {
        let ds = sample();
        assert!(ds.missing_columns(ds.schema()).is_empty());
    }

    #[test]
    fn test_append_same_schema() {
        let mut a = sample();
        let b = sample();
        a.append(b).unwrap();
        assert_eq!(a.len(), 4);
    }
}
