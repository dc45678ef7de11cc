//! Container lifecycle reconciliation.
//!
//! Before any storage operation the tool drives the named database
//! container toward the running state: create it when absent, start it
//! when stopped, leave it alone when already running. The daemon is
//! reached through the docker CLI; the [`ContainerDaemon`] trait keeps the
//! state machine testable without one.

use std::process::Command;

use thiserror::Error;
use which::which;

/// Run-state string the daemon reports for a live container.
const RUNNING_STATE: &str = "running";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("docker binary not found; install Docker")]
    NotInstalled,

    #[error("docker service is not active and could not be started")]
    ServiceUnavailable,

    #[error("docker {action} failed: {stderr}")]
    CommandFailed { action: &'static str, stderr: String },

    #[error("failed to invoke docker: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to create the database container.
///
/// Built fresh from configuration on every invocation and never mutated;
/// identity is the `name`.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Entrypoint arguments passed to the image.
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub container_port: u16,
    pub host_port: String,
}

/// One row of the daemon's container listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub name: String,
    pub state: String,
}

/// The daemon operations the reconciler needs.
pub trait ContainerDaemon {
    /// List all containers, including stopped ones.
    fn list_all(&self) -> Result<Vec<ContainerSummary>, DaemonError>;

    /// Create a container from a spec without starting it.
    fn create(&self, spec: &ContainerSpec) -> Result<(), DaemonError>;

    /// Start a container by name.
    fn start(&self, name: &str) -> Result<(), DaemonError>;
}

/// What [`ensure_running`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    AlreadyRunning,
    Started,
    Created,
}

/// Drives the named container to the running state.
///
/// Observes the daemon's listing, then applies exactly the transition the
/// observed state requires. An existing container is never deleted or
/// recreated.
pub fn ensure_running(
    daemon: &impl ContainerDaemon,
    spec: &ContainerSpec,
) -> Result<Reconciliation, DaemonError> {
    let (exists, running) = container_status(daemon, &spec.name)?;

    if !exists {
        log::info!("Container '{}' not found, creating it", spec.name);
        daemon.create(spec)?;
        daemon.start(&spec.name)?;
        return Ok(Reconciliation::Created);
    }

    if !running {
        log::info!("Container '{}' exists but is stopped, starting it", spec.name);
        daemon.start(&spec.name)?;
        return Ok(Reconciliation::Started);
    }

    log::debug!("Container '{}' is already running", spec.name);
    Ok(Reconciliation::AlreadyRunning)
}

/// Derives `(exists, running)` for a container name from the daemon listing.
///
/// The daemon prefixes names with a `/` separator; matches are made on the
/// normalized name.
fn container_status(
    daemon: &impl ContainerDaemon,
    name: &str,
) -> Result<(bool, bool), DaemonError> {
    for container in daemon.list_all()? {
        if container.name.trim_start_matches('/') == name {
            return Ok((true, container.state == RUNNING_STATE));
        }
    }
    Ok((false, false))
}

/// Daemon access through the docker CLI.
pub struct CliDaemon {
    binary: &'static str,
}

impl CliDaemon {
    /// Locates the docker binary and makes sure the daemon service is
    /// active, escalating once through systemctl if it is not.
    pub fn connect() -> Result<Self, DaemonError> {
        if which("docker").is_err() {
            return Err(DaemonError::NotInstalled);
        }

        let daemon = Self { binary: "docker" };
        daemon.ensure_service_active()?;
        Ok(daemon)
    }

    fn ensure_service_active(&self) -> Result<(), DaemonError> {
        let active = Command::new("systemctl")
            .args(["is-active", "--quiet", "docker"])
            .status()?
            .success();
        if active {
            return Ok(());
        }

        log::warn!("Docker service is not active, attempting to start it");
        let started = Command::new("sudo")
            .args(["systemctl", "start", "docker"])
            .status()?
            .success();
        if started {
            Ok(())
        } else {
            Err(DaemonError::ServiceUnavailable)
        }
    }

    fn run(&self, action: &'static str, args: &[String]) -> Result<String, DaemonError> {
        let output = Command::new(self.binary).args(args).output()?;
        if !output.status.success() {
            return Err(DaemonError::CommandFailed {
                action,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl ContainerDaemon for CliDaemon {
    fn list_all(&self) -> Result<Vec<ContainerSummary>, DaemonError> {
        let args = vec![
            "ps".to_string(),
            "-a".to_string(),
            "--format".to_string(),
            "{{.Names}}\t{{.State}}".to_string(),
        ];
        let stdout = self.run("list", &args)?;

        let containers = stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let mut parts = line.split('\t');
                ContainerSummary {
                    name: parts.next().unwrap_or("").to_string(),
                    state: parts.next().unwrap_or("").to_string(),
                }
            })
            .collect();

        Ok(containers)
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), DaemonError> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-p".to_string(),
            format!("{}:{}", spec.host_port, spec.container_port),
        ];
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args.extend(spec.args.iter().cloned());

        self.run("create", &args)?;
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), DaemonError> {
        let args = vec!["start".to_string(), name.to_string()];
        self.run("start", &args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// In-memory daemon that records every mutation call.
    struct FakeDaemon {
        containers: RefCell<Vec<ContainerSummary>>,
        creates: RefCell<usize>,
        starts: RefCell<usize>,
    }

    impl FakeDaemon {
        fn new(containers: Vec<ContainerSummary>) -> Self {
            Self {
                containers: RefCell::new(containers),
                creates: RefCell::new(0),
                starts: RefCell::new(0),
            }
        }
    }

    impl ContainerDaemon for FakeDaemon {
        fn list_all(&self) -> Result<Vec<ContainerSummary>, DaemonError> {
            Ok(self.containers.borrow().clone())
        }

        fn create(&self, spec: &ContainerSpec) -> Result<(), DaemonError> {
            *self.creates.borrow_mut() += 1;
            self.containers.borrow_mut().push(ContainerSummary {
                // The daemon reports names with a leading separator.
                name: format!("/{}", spec.name),
                state: "created".to_string(),
            });
            Ok(())
        }

        fn start(&self, name: &str) -> Result<(), DaemonError> {
            *self.starts.borrow_mut() += 1;
            for container in self.containers.borrow_mut().iter_mut() {
                if container.name.trim_start_matches('/') == name {
                    container.state = "running".to_string();
                }
            }
            Ok(())
        }
    }

    fn spec() -> ContainerSpec {
        ContainerSpec {
            name: "pass-db".to_string(),
            image: "postgres".to_string(),
            args: vec![],
            env: vec![],
            container_port: 5432,
            host_port: "5432".to_string(),
        }
    }

    #[test]
    fn test_absent_container_is_created_and_started() {
        let daemon = FakeDaemon::new(vec![]);

        let outcome = ensure_running(&daemon, &spec()).unwrap();

        assert_eq!(outcome, Reconciliation::Created);
        assert_eq!(*daemon.creates.borrow(), 1);
        assert_eq!(*daemon.starts.borrow(), 1);
        let (exists, running) = container_status(&daemon, "pass-db").unwrap();
        assert!(exists && running);
    }

    #[test]
    fn test_stopped_container_is_started_not_recreated() {
        let daemon = FakeDaemon::new(vec![ContainerSummary {
            name: "/pass-db".to_string(),
            state: "exited".to_string(),
        }]);

        let outcome = ensure_running(&daemon, &spec()).unwrap();

        assert_eq!(outcome, Reconciliation::Started);
        assert_eq!(*daemon.creates.borrow(), 0);
        assert_eq!(*daemon.starts.borrow(), 1);
    }

    #[test]
    fn test_running_container_is_left_alone() {
        let daemon = FakeDaemon::new(vec![ContainerSummary {
            name: "/pass-db".to_string(),
            state: "running".to_string(),
        }]);

        let outcome = ensure_running(&daemon, &spec()).unwrap();

        assert_eq!(outcome, Reconciliation::AlreadyRunning);
        assert_eq!(*daemon.creates.borrow(), 0);
        assert_eq!(*daemon.starts.borrow(), 0);
    }

    #[test]
    fn test_other_containers_do_not_match() {
        let daemon = FakeDaemon::new(vec![
            ContainerSummary {
                name: "/pass-db-old".to_string(),
                state: "running".to_string(),
            },
            ContainerSummary {
                name: "/unrelated".to_string(),
                state: "exited".to_string(),
            },
        ]);

        let (exists, _) = container_status(&daemon, "pass-db").unwrap();
        assert!(!exists);
    }

    #[test]
    fn test_name_match_without_separator_prefix() {
        // The docker CLI listing reports bare names; both forms must match.
        let daemon = FakeDaemon::new(vec![ContainerSummary {
            name: "pass-db".to_string(),
            state: "running".to_string(),
        }]);

        let (exists, running) = container_status(&daemon, "pass-db").unwrap();
        assert!(exists && running);
    }
}
