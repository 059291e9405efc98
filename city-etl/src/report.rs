//! Rapport d'exécution d'un pipeline
//!
//! Les géométries dégradées en Null ne font pas échouer l'exécution ; elles
//! sont comptées et rendent le statut partiel.

use std::path::Path;
use std::time::Duration;

use citygeo::NormalizeReport;
use serde::Serialize;

use crate::error::EtlError;
use crate::load::SaveReport;

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Chargé sans dégradation
    Success,
    /// Chargé, certaines géométries nulles
    PartialSuccess,
    /// Préparé sans écriture (exécution à blanc)
    DryRun,
    /// Échec, aucune écriture commitée
    Failed,
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    pub status: RunStatus,
    pub duration_secs: f64,

    /// Enregistrements extraits
    pub records: usize,
    /// Géométries canoniques produites
    pub geometries: usize,
    /// Enregistrements sans géométrie en entrée
    pub missing_geometries: usize,
    /// Géométries dégradées en Null
    pub degraded_geometries: usize,

    pub load_behavior: Option<String>,
    pub tables: Vec<String>,
    /// Lignes insérées, toutes tables confondues
    pub rows_written: u64,

    /// Étape en échec et message
    pub failed_stage: Option<String>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(pipeline: &str) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            status: RunStatus::Success,
            duration_secs: 0.0,
            records: 0,
            geometries: 0,
            missing_geometries: 0,
            degraded_geometries: 0,
            load_behavior: None,
            tables: Vec::new(),
            rows_written: 0,
            failed_stage: None,
            error: None,
        }
    }

    pub fn record_normalize(&mut self, report: &NormalizeReport) {
        self.records = report.records;
        self.geometries = report.encoded;
        self.missing_geometries = report.missing;
        self.degraded_geometries = report.degraded;
    }

    /// Dataset sans géométrie : seul le nombre d'enregistrements compte
    pub fn record_rows(&mut self, records: usize) {
        self.records = records;
    }

    pub fn record_save(&mut self, save: &SaveReport) {
        self.load_behavior = Some(save.behavior.to_string());
        self.tables = save.tables.clone();
        self.rows_written = save.rows_written;
    }

    pub fn record_failure(&mut self, error: &EtlError) {
        self.failed_stage = Some(error.stage().to_string());
        self.error = Some(error.to_string());
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self, dry_run: bool) {
        self.status = if self.error.is_some() {
            RunStatus::Failed
        } else if dry_run {
            RunStatus::DryRun
        } else if self.degraded_geometries > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
    }

    pub fn is_failure(&self) -> bool {
        self.status == RunStatus::Failed
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("RUN REPORT - {}", self.pipeline);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Records: {} extracted, {} geometries, {} missing, {} degraded",
            self.records, self.geometries, self.missing_geometries, self.degraded_geometries
        );
        if let Some(behavior) = &self.load_behavior {
            println!(
                "Load: {} -> {} ({} rows written)",
                behavior,
                self.tables.join(", "),
                self.rows_written
            );
        }

        if let (Some(stage), Some(error)) = (&self.failed_stage, &self.error) {
            println!("\n--- ERROR ({}) ---", stage);
            println!("  {}", error);
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {:?}, {} rows written, {} degraded geometries",
            self.pipeline, self.status, self.rows_written, self.degraded_geometries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_finalize_success() {
        let mut report = RunReport::new("heal_hospital");
        report.record_normalize(&NormalizeReport {
            records: 10,
            encoded: 10,
            missing: 0,
            degraded: 0,
        });
        report.finalize(false);
        assert_eq!(report.status, RunStatus::Success);
    }

    #[test]
    fn test_finalize_partial() {
        let mut report = RunReport::new("work_sidewalk");
        report.record_normalize(&NormalizeReport {
            records: 10,
            encoded: 8,
            missing: 1,
            degraded: 1,
        });
        report.finalize(false);
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert!(!report.is_failure());
    }

    #[test]
    fn test_plain_dataset_counts_records() {
        let mut report = RunReport::new("building_permit");
        report.record_rows(42);
        report.finalize(false);
        assert_eq!(report.records, 42);
        assert_eq!(report.geometries, 0);
        assert_eq!(report.status, RunStatus::Success);
    }

    #[test]
    fn test_failure_names_stage() {
        let mut report = RunReport::new("heal_hospital");
        report.record_failure(&EtlError::Config(ConfigError::MissingHistoryTable));
        report.finalize(true);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_stage.as_deref(), Some("configuration"));
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = RunReport::new("tran_ubike_station");
        report.finalize(true);
        report.save_to_file(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["pipeline"], "tran_ubike_station");
        assert_eq!(json["status"], "DryRun");
        assert!(report.summary().contains("DryRun"));
    }
}
