//! Transaction atomique pour une sauvegarde
//!
//! Garantit le rollback en cas d'erreur : la table courante n'est jamais
//! laissée vidée sans avoir été rechargée.

use deadpool_postgres::{Object, Transaction};
use tracing::{error, info};

use crate::error::SinkError;

/// Statut d'une sauvegarde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Commitée
    Committed,
    /// Annulée (rollback)
    RolledBack,
}

/// Résultat d'une transaction de chargement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub label: String,
    pub rows_written: u64,
    pub status: LoadStatus,
}

/// Transaction de chargement
pub struct LoadTransaction<'a> {
    transaction: Transaction<'a>,
    label: String,
    rows_written: u64,
}

impl<'a> LoadTransaction<'a> {
    /// Démarre une transaction
    pub async fn begin(client: &'a mut Object, label: &str) -> Result<Self, SinkError> {
        let transaction = client.transaction().await?;

        info!(label = %label, "Starting load transaction");

        Ok(Self {
            transaction,
            label: label.to_string(),
            rows_written: 0,
        })
    }

    /// Accède à la transaction sous-jacente
    pub fn transaction(&self) -> &Transaction<'a> {
        &self.transaction
    }

    pub fn record_rows(&mut self, rows: u64) {
        self.rows_written += rows;
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Commit de toutes les étapes
    pub async fn commit(self) -> Result<LoadOutcome, SinkError> {
        self.transaction.commit().await?;

        info!(
            label = %self.label,
            rows = self.rows_written,
            "Load transaction committed"
        );

        Ok(LoadOutcome {
            label: self.label,
            rows_written: self.rows_written,
            status: LoadStatus::Committed,
        })
    }

    /// Annule toutes les étapes
    ///
    /// La transaction est également annulée si elle est droppée.
    pub async fn rollback(self, reason: &str) -> LoadOutcome {
        error!(
            label = %self.label,
            reason = %reason,
            rows_attempted = self.rows_written,
            "Rolling back load transaction"
        );

        if let Err(e) = self.transaction.rollback().await {
            error!(error = %e, "Explicit rollback failed (will rollback on drop anyway)");
        }

        LoadOutcome {
            label: self.label,
            rows_written: 0,
            status: LoadStatus::RolledBack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_equality() {
        let outcome = LoadOutcome {
            label: "heal_hospital".into(),
            rows_written: 0,
            status: LoadStatus::RolledBack,
        };
        assert_ne!(outcome.status, LoadStatus::Committed);
        assert!(format!("{:?}", outcome).contains("heal_hospital"));
    }
}
