//! Chargement d'un dataset selon un mode (append, replace, current+history)

pub mod directive;
pub mod executor;
pub mod memory;
pub mod plan;
pub mod pool;
pub mod postgres;
pub mod transaction;

pub use directive::{GeometryTarget, LoadBehavior, LoadDirective, ValidatedDirective, WriteMode};
pub use executor::{save_dataset, save_geo_dataset, SaveReport};
pub use memory::{MemorySink, MemoryTable};
pub use plan::{TableSpec, WritePlan, WriteStep};
pub use pool::{create_pool, test_connection, DatabaseConfig, DatabaseOverrides, SslMode};
pub use postgres::PostgresSink;

use crate::error::SinkError;

/// Destination relationnelle d'un plan d'écriture
///
/// `execute` applique toutes les étapes ou aucune et retourne le nombre
/// de lignes insérées, toutes tables confondues.
#[allow(async_fn_in_trait)]
pub trait Sink {
    fn name(&self) -> &str;

    async fn execute(&mut self, plan: &WritePlan<'_>) -> Result<u64, SinkError>;
}
