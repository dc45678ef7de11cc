//! Command definitions and dispatch.
//!
//! Each invocation runs exactly one store operation; the outcome messages
//! are printed here so the store itself never touches the console beyond
//! confirmation prompts.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::generator;
use crate::store::{DeleteOutcome, InsertOutcome, PasswordStore};

#[derive(Parser)]
#[command(name = "passgen")]
#[command(version = "0.1")]
#[command(about = "Generates passwords and keeps them encrypted in Postgres", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a password and store it under a service name.
    Add {
        /// Service the password belongs to
        service: Option<String>,
        /// Print the password without storing it
        #[arg(long)]
        no_save: bool,
        /// Length of the generated password
        #[arg(long, default_value_t = generator::DEFAULT_LENGTH)]
        length: usize,
    },
    /// Show all stored passwords, decrypted.
    #[command(alias = "ls")]
    List,
    /// Delete a password by id.
    #[command(alias = "rm")]
    Delete {
        /// Id of the password to delete
        id: i32,
    },
    /// Delete the most recently created passwords.
    DeleteLast {
        /// How many passwords to delete
        count: i64,
    },
    /// Find all passwords stored for a service.
    FindService {
        /// Service name, matched exactly
        service: String,
    },
    /// Find a password by id.
    FindId {
        /// Id of the password to look up
        id: i32,
    },
    /// Delete every password and reset ids.
    Clear,
}

/// Runs the selected command against the store.
pub fn dispatch(command: Option<Commands>, store: &mut PasswordStore) -> Result<()> {
    // Bare invocation behaves like `add` with the defaults.
    let command = command.unwrap_or(Commands::Add {
        service: None,
        no_save: false,
        length: generator::DEFAULT_LENGTH,
    });

    match command {
        Commands::Add {
            service,
            no_save,
            length,
        } => {
            let password = generator::generate(length);
            if no_save {
                println!("New password:\n\n{password}");
                return Ok(());
            }

            let service = service.unwrap_or_else(|| "undefined".to_string());
            match store.insert(&password, &service)? {
                InsertOutcome::Inserted => {
                    println!("New password:\n\n{password}\n\nService: {service}");
                }
                InsertOutcome::AlreadyExists => {
                    println!("Password already exists in the database");
                }
            }
        }
        Commands::List => {
            let records = store.list_all()?;
            if records.is_empty() {
                println!("No passwords stored.");
            } else {
                println!("Table 'passwords' content:");
                for record in records {
                    println!(
                        "ID: {}, Password: {}, Service: {}",
                        record.id, record.password, record.service
                    );
                }
            }
        }
        Commands::Delete { id } => match store.delete_by_id(id)? {
            DeleteOutcome::Deleted => println!("Password {id} deleted"),
            DeleteOutcome::NotFound => {
                println!("Password with ID {id} does not exist in the database");
            }
            DeleteOutcome::Canceled => println!("Operation canceled"),
        },
        Commands::DeleteLast { count } => match store.delete_last(count)? {
            DeleteOutcome::Deleted => println!("Deleted the last {count} passwords"),
            DeleteOutcome::Canceled => println!("Operation canceled"),
            DeleteOutcome::NotFound => unreachable!("delete_last has no existence check"),
        },
        Commands::FindService { service } => {
            let passwords = store.find_by_service(&service)?;
            if passwords.is_empty() {
                println!("No passwords found for service {service}");
            } else {
                println!("Passwords for service {service}:");
                for password in passwords {
                    println!("{password}");
                }
            }
        }
        Commands::FindId { id } => match store.find_by_id(id)? {
            Some(password) => println!("Password: {password}"),
            None => println!("Password with ID {id} not found"),
        },
        Commands::Clear => match store.clear_all()? {
            DeleteOutcome::Deleted => println!("Table cleared"),
            DeleteOutcome::Canceled => println!("Operation canceled"),
            DeleteOutcome::NotFound => unreachable!("clear_all has no existence check"),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_service() {
        let cli = Cli::try_parse_from(["passgen", "add", "email", "--length", "20"]).unwrap();
        match cli.command {
            Some(Commands::Add {
                service,
                no_save,
                length,
            }) => {
                assert_eq!(service.as_deref(), Some("email"));
                assert!(!no_save);
                assert_eq!(length, 20);
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_parse_bare_invocation() {
        let cli = Cli::try_parse_from(["passgen"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_delete_last() {
        let cli = Cli::try_parse_from(["passgen", "delete-last", "2"]).unwrap();
        match cli.command {
            Some(Commands::DeleteLast { count }) => assert_eq!(count, 2),
            _ => panic!("expected delete-last command"),
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert!(Cli::try_parse_from(["passgen", "ls"]).is_ok());
        assert!(Cli::try_parse_from(["passgen", "rm", "3"]).is_ok());
    }
}
