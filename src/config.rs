//! Runtime configuration.
//!
//! Every value is read from the environment once at startup and carried in
//! a [`Config`] passed by parameter; a missing or empty variable is a fatal
//! configuration error surfaced before any work happens.

use anyhow::{Result, anyhow};

use crate::docker::ContainerSpec;

/// Port Postgres listens on inside the container.
const POSTGRES_PORT: u16 = 5432;

#[derive(Debug, Clone)]
pub struct Config {
    pub container_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_port: String,
    pub db_name: String,
    pub db_host: String,
    pub ssl_mode: String,
    pub host_port: String,
    pub encryption_key: String,
}

fn require(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(anyhow!("{name} is not set")),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            container_name: require("CONTAINER_NAME")?,
            db_user: require("CONTAINER_USER")?,
            db_password: require("DB_PASSWORD")?,
            db_port: require("DB_PORT")?,
            db_name: require("DB_NAME")?,
            db_host: require("DB_HOST")?,
            ssl_mode: require("SSL_MODE")?,
            host_port: require("HOST_PORT")?,
            encryption_key: require("ENCRYPTION_KEY")?,
        })
    }

    /// Key material for the cipher.
    pub fn encryption_key(&self) -> &[u8] {
        self.encryption_key.as_bytes()
    }

    /// libpq-style connection string for the managed database.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode={}",
            self.db_host, self.db_port, self.db_user, self.db_password, self.db_name, self.ssl_mode
        )
    }

    /// Descriptor of the database container, built fresh per invocation.
    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            name: self.container_name.clone(),
            image: "postgres".to_string(),
            // scram-sha-256 and the permissive listen address decide how the
            // later connection authenticates.
            args: vec![
                "postgres".to_string(),
                "-c".to_string(),
                "password_encryption=scram-sha-256".to_string(),
                "-c".to_string(),
                "listen_addresses=*".to_string(),
                "-c".to_string(),
                "hba_file=/var/lib/postgresql/data/pg_hba.conf".to_string(),
            ],
            env: vec![
                ("POSTGRES_USER".to_string(), self.db_user.clone()),
                ("POSTGRES_PASSWORD".to_string(), self.db_password.clone()),
            ],
            container_port: POSTGRES_PORT,
            host_port: self.host_port.clone(),
        }
    }
}
