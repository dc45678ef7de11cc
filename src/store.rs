//! Encrypted credential persistence.
//!
//! One table, `passwords(id SERIAL PRIMARY KEY, password TEXT UNIQUE NOT
//! NULL, service TEXT NOT NULL)`. Plaintext never reaches the table: every
//! write goes through [`crate::crypto::encrypt`] and every read through
//! [`crate::crypto::decrypt`]. Destructive operations go through an
//! injected [`Confirmation`] so the logic stays testable without a console.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use postgres::{Client, NoTls};

use crate::crypto;

/// Total wait budget for the initial reachability check.
pub const CONNECT_BUDGET: Duration = Duration::from_secs(20);

/// Sleep between connection attempts.
pub const CONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Yes/no capability for destructive operations.
pub trait Confirmation {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Reads one line from standard input; only a literal `y` authorizes.
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        print!("{prompt} (y/n): ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(is_yes(&line))
    }
}

fn is_yes(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']) == "y"
}

/// A decrypted row of the passwords table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    pub id: i32,
    pub password: String,
    pub service: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Canceled,
}

/// Connects to the database, polling until it is reachable.
///
/// A freshly started container needs a moment before Postgres accepts
/// connections. After the budget runs out the timeout is logged and the
/// last error is returned for the caller to handle; no hard failure
/// happens here.
pub fn connect_with_retry(params: &str, budget: Duration, interval: Duration) -> Result<Client> {
    let start = Instant::now();
    loop {
        match Client::connect(params, NoTls) {
            Ok(client) => return Ok(client),
            Err(err) => {
                if start.elapsed() > budget {
                    log::warn!("Database connection timeout");
                    return Err(err.into());
                }
                log::info!("Waiting for database connection...");
                thread::sleep(interval);
            }
        }
    }
}

pub struct PasswordStore {
    client: Client,
    key: Vec<u8>,
    confirm: Box<dyn Confirmation>,
}

impl PasswordStore {
    pub fn new(client: Client, key: &[u8], confirm: Box<dyn Confirmation>) -> Self {
        Self {
            client,
            key: key.to_vec(),
            confirm,
        }
    }

    /// Creates the passwords table when absent; a no-op on every later run.
    pub fn ensure_schema(&mut self) -> Result<()> {
        self.client.execute(
            "CREATE TABLE IF NOT EXISTS passwords (
                id SERIAL PRIMARY KEY,
                password TEXT UNIQUE NOT NULL,
                service TEXT NOT NULL
            )",
            &[],
        )?;
        Ok(())
    }

    /// Encrypts and stores a password under a service label.
    ///
    /// The duplicate check compares the fresh ciphertext against stored
    /// ones. With a random nonce per encryption a byte-identical repeat is
    /// practically impossible, so this is a best-effort check only, not a
    /// guarantee against storing the same plaintext twice.
    pub fn insert(&mut self, plaintext: &str, service: &str) -> Result<InsertOutcome> {
        let encrypted = crypto::encrypt(plaintext, &self.key)?;

        let row = self.client.query_one(
            "SELECT EXISTS(SELECT 1 FROM passwords WHERE password = $1)",
            &[&encrypted],
        )?;
        if row.get::<_, bool>(0) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        self.client.execute(
            "INSERT INTO passwords (password, service) VALUES ($1, $2)",
            &[&encrypted, &service],
        )?;
        log::info!("Stored a new password for service '{service}'");
        Ok(InsertOutcome::Inserted)
    }

    /// Returns every record, decrypted.
    ///
    /// A single undecryptable row fails the whole listing; partial output
    /// under a stale key would be untrustworthy.
    pub fn list_all(&mut self) -> Result<Vec<PasswordRecord>> {
        let rows = self
            .client
            .query("SELECT id, password, service FROM passwords ORDER BY id", &[])?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let encrypted: String = row.get(1);
            records.push(PasswordRecord {
                id: row.get(0),
                password: crypto::decrypt(&encrypted, &self.key)?,
                service: row.get(2),
            });
        }
        Ok(records)
    }

    /// Deletes one record after confirmation.
    ///
    /// A missing id is reported without prompting and without issuing a
    /// delete.
    pub fn delete_by_id(&mut self, id: i32) -> Result<DeleteOutcome> {
        let row = self.client.query_one(
            "SELECT EXISTS(SELECT 1 FROM passwords WHERE id = $1)",
            &[&id],
        )?;
        if !row.get::<_, bool>(0) {
            return Ok(DeleteOutcome::NotFound);
        }

        let prompt = format!("Do you really want to delete password {id}?");
        if !self.confirm.confirm(&prompt)? {
            return Ok(DeleteOutcome::Canceled);
        }

        self.client
            .execute("DELETE FROM passwords WHERE id = $1", &[&id])?;
        log::info!("Deleted password {id}");
        Ok(DeleteOutcome::Deleted)
    }

    /// Deletes the `count` most recently created records after confirmation.
    pub fn delete_last(&mut self, count: i64) -> Result<DeleteOutcome> {
        let prompt = format!("Do you really want to delete the last {count} passwords?");
        if !self.confirm.confirm(&prompt)? {
            return Ok(DeleteOutcome::Canceled);
        }

        self.client.execute(
            "DELETE FROM passwords
             WHERE id IN (SELECT id FROM passwords ORDER BY id DESC LIMIT $1)",
            &[&count],
        )?;
        log::info!("Deleted the last {count} passwords");
        Ok(DeleteOutcome::Deleted)
    }

    /// Returns decrypted passwords whose service matches exactly.
    pub fn find_by_service(&mut self, service: &str) -> Result<Vec<String>> {
        let rows = self.client.query(
            "SELECT password FROM passwords WHERE service = $1 ORDER BY id",
            &[&service],
        )?;

        let mut passwords = Vec::with_capacity(rows.len());
        for row in rows {
            let encrypted: String = row.get(0);
            passwords.push(crypto::decrypt(&encrypted, &self.key)?);
        }
        Ok(passwords)
    }

    /// Returns one decrypted password, or `None` when the id is unknown.
    pub fn find_by_id(&mut self, id: i32) -> Result<Option<String>> {
        let row = self
            .client
            .query_opt("SELECT password FROM passwords WHERE id = $1", &[&id])?;

        match row {
            Some(row) => {
                let encrypted: String = row.get(0);
                Ok(Some(crypto::decrypt(&encrypted, &self.key)?))
            }
            None => Ok(None),
        }
    }

    /// Deletes every record and restarts the id sequence at 1, after
    /// confirmation.
    pub fn clear_all(&mut self) -> Result<DeleteOutcome> {
        if !self
            .confirm
            .confirm("Do you really want to clear the table?")?
        {
            return Ok(DeleteOutcome::Canceled);
        }

        self.client.execute("DELETE FROM passwords", &[])?;
        self.client
            .execute("ALTER SEQUENCE passwords_id_seq RESTART WITH 1", &[])?;
        log::info!("Cleared the passwords table");
        Ok(DeleteOutcome::Deleted)
    }
}
