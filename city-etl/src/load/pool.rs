//! Pool de connexions PostgreSQL

use std::time::Duration;

use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

use crate::error::{ConfigError, SinkError};

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(ConfigError::InvalidSetting {
                name: "ssl mode",
                value: s.to_string(),
                expected: "disable, prefer or require",
            }),
        }
    }
}

/// Lit une valeur numérique ; une valeur présente mais invalide est refusée
fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.trim().parse().map_err(|_| ConfigError::InvalidSetting {
            name,
            value,
            expected: "a positive integer",
        })
    })
    .transpose()
}

/// Configuration de la base du tableau de bord
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub pool_size: usize,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5433,
            dbname: "dashboard".into(),
            user: "postgres".into(),
            password: None,
            pool_size: 2,
            ssl_mode: SslMode::Disable,
        }
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construit la configuration depuis une fonction de lecture des variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("PGHOST").unwrap_or(defaults.host),
            port: parse_number("PGPORT", lookup("PGPORT"))?.unwrap_or(defaults.port),
            dbname: lookup("PGDATABASE").unwrap_or(defaults.dbname),
            user: lookup("PGUSER").unwrap_or(defaults.user),
            password: lookup("PGPASSWORD"),
            pool_size: parse_number("POOL_SIZE", lookup("POOL_SIZE"))?
                .unwrap_or(defaults.pool_size),
            ssl_mode: lookup("PGSSLMODE")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Applique les surcharges passées en ligne de commande
    ///
    /// Un mode SSL inconnu est une erreur de configuration.
    pub fn apply_overrides(&mut self, overrides: DatabaseOverrides) -> Result<(), ConfigError> {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(database) = overrides.database {
            self.dbname = database;
        }
        if let Some(user) = overrides.user {
            self.user = user;
        }
        if let Some(password) = overrides.password {
            self.password = Some(password);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(ssl) = overrides.ssl {
            self.ssl_mode = ssl.parse()?;
        }
        Ok(())
    }
}

/// Surcharges optionnelles de la connexion
#[derive(Debug, Clone, Default)]
pub struct DatabaseOverrides {
    pub host: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<String>,
}

/// Crée la configuration TLS pour rustls
fn make_tls_connector() -> MakeRustlsConnect {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(config)
}

/// Crée un pool de connexions
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, SinkError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = config.password.clone();

    cfg.pool = Some(PoolConfig {
        max_size: config.pool_size,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });

    debug!(
        host = %config.host,
        port = config.port,
        dbname = %config.dbname,
        ssl = ?config.ssl_mode,
        "Creating database pool"
    );

    let pool = match config.ssl_mode {
        SslMode::Disable => cfg.create_pool(Some(Runtime::Tokio1), NoTls)?,
        SslMode::Prefer | SslMode::Require => {
            cfg.create_pool(Some(Runtime::Tokio1), make_tls_connector())?
        }
    };
    Ok(pool)
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<(), SinkError> {
    let client = pool.get().await?;
    client.execute("SELECT 1", &[]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
        assert_eq!("OFF".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert!("maybe".parse::<SslMode>().is_err());
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = DatabaseConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.port, 5433);
        assert_eq!(config.dbname, "dashboard");
    }

    #[test]
    fn test_lookup_and_overrides() {
        let env: HashMap<&str, &str> = [("PGHOST", "db"), ("PGPORT", "6543"), ("PGSSLMODE", "require")]
            .into_iter()
            .collect();
        let mut config =
            DatabaseConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.host, "db");
        assert_eq!(config.port, 6543);
        assert_eq!(config.ssl_mode, SslMode::Require);

        config.apply_overrides(DatabaseOverrides {
            database: Some("ready".into()),
            ssl: Some("disable".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.dbname, "ready");
        assert_eq!(config.ssl_mode, SslMode::Disable);
        assert_eq!(config.host, "db");
    }

    #[test]
    fn test_invalid_ssl_override_rejected() {
        let mut config = DatabaseConfig::default();
        let err = config
            .apply_overrides(DatabaseOverrides {
                ssl: Some("maybe".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { name: "ssl mode", ref value, .. } if value == "maybe"
        ));
        assert_eq!(config.ssl_mode, SslMode::Disable);
    }

    #[test]
    fn test_invalid_env_values_rejected() {
        let err = DatabaseConfig::from_lookup(|k| (k == "PGSSLMODE").then(|| "sometimes".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "ssl mode", .. }));

        let err = DatabaseConfig::from_lookup(|k| (k == "PGPORT").then(|| "54x".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "PGPORT", .. }));
    }
}
