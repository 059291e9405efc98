//! Puits en mémoire (exécution à blanc, tests)
//!
//! Le plan est appliqué sur une copie des tables, substituée à l'état
//! courant seulement si toutes les étapes réussissent.

use std::collections::BTreeMap;

use citygeo::{Row, Value};
use tracing::debug;

use super::plan::{ColumnSpec, WritePlan, WriteStep};
use super::Sink;
use crate::error::SinkError;

/// Table en mémoire
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Valeurs d'une colonne
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

/// Puits en mémoire
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, MemoryTable>,
    fail_on_insert: Option<String>,
    executions: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pré-remplit une table
    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// Fait échouer toute insertion dans `table`
    pub fn fail_on_insert(&mut self, table: &str) {
        self.fail_on_insert = Some(table.to_string());
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.tables.get(name).map_or(0, |t| t.rows.len())
    }

    /// Nombre de plans reçus, y compris ceux en échec
    pub fn executions(&self) -> usize {
        self.executions
    }

    fn apply(
        &self,
        tables: &mut BTreeMap<String, MemoryTable>,
        plan: &WritePlan<'_>,
    ) -> Result<u64, SinkError> {
        let mut written = 0u64;
        for step in &plan.steps {
            match step {
                WriteStep::Ensure(spec) => {
                    tables.entry(spec.name.clone()).or_insert_with(|| MemoryTable {
                        columns: spec.columns.clone(),
                        rows: Vec::new(),
                    });
                }
                WriteStep::Truncate(name) => {
                    let table = tables
                        .get_mut(name)
                        .ok_or_else(|| SinkError::Failed(format!("table {name} does not exist")))?;
                    table.rows.clear();
                }
                WriteStep::Insert(name) => {
                    if self.fail_on_insert.as_deref() == Some(name.as_str()) {
                        return Err(SinkError::Failed(format!("insert into {name} rejected")));
                    }
                    let table = tables
                        .get_mut(name)
                        .ok_or_else(|| SinkError::Failed(format!("table {name} does not exist")))?;
                    written += insert_rows(name, table, plan)?;
                }
            }
        }
        Ok(written)
    }
}

fn insert_rows(name: &str, table: &mut MemoryTable, plan: &WritePlan<'_>) -> Result<u64, SinkError> {
    let mapping = plan
        .dataset
        .schema()
        .names()
        .map(|column| {
            table
                .column_index(column)
                .ok_or_else(|| SinkError::UnknownColumn {
                    table: name.to_string(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for source in plan.dataset.rows() {
        let mut row = vec![Value::Null; table.columns.len()];
        for (value, &target) in source.iter().zip(&mapping) {
            row[target] = value.clone();
        }
        table.rows.push(row);
    }
    Ok(plan.dataset.len() as u64)
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute(&mut self, plan: &WritePlan<'_>) -> Result<u64, SinkError> {
        self.executions += 1;
        let mut staged = self.tables.clone();
        let written = self.apply(&mut staged, plan)?;
        self.tables = staged;
        debug!(steps = plan.steps.len(), rows = written, "Memory plan committed");
        Ok(written)
    }
}
