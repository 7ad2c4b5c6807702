//! Configuration handling for the simulator.
//!
//! Settings come from the `simulation:` section of a YAML file, are then
//! overridden by `LINKSTATE_*` environment variables and finally by command
//! line flags. The merged result is validated before anything is built.

use anyhow::{bail, Context, Result};
use linkstate_agent::NetworkConfig;
use linkstate_topology::{RandomTopology, MIN_DEGREE_FLOOR};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable prefix
const ENV_PREFIX: &str = "LINKSTATE_";

/// Simulator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of routers
    pub nodes: usize,
    /// Maximum links per router
    pub max_edges: usize,
    /// Random link weights are drawn from `1..=weight_ceiling`
    pub weight_ceiling: u32,
    /// Topology and traffic seed, random when absent
    pub seed: Option<u64>,
    /// Route computation threads, 0 for available parallelism
    pub workers: usize,
    /// Capacity of each router mailbox
    pub mailbox_capacity: usize,
    /// Weight of added links when none is entered
    pub default_link_weight: u32,
    /// Upper bound on one discovery round
    pub discovery_timeout: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: 10,
            max_edges: 3,
            weight_ceiling: 20,
            seed: None,
            workers: 0,
            mailbox_capacity: 1,
            default_link_weight: 1,
            discovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Root of the YAML file
#[derive(Debug, Deserialize)]
struct RootConfig {
    simulation: Option<SimulationSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationSection {
    nodes: Option<usize>,
    max_edges: Option<usize>,
    weight_ceiling: Option<u32>,
    seed: Option<u64>,
    workers: Option<usize>,
    mailbox_capacity: Option<usize>,
    default_link_weight: Option<u32>,
    discovery_timeout: Option<String>,
}

impl SimConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();
        let config_path = config_path.as_ref();

        match std::fs::read_to_string(config_path) {
            Ok(content) => {
                let root: RootConfig = serde_yaml::from_str(&content)
                    .with_context(|| format!("failed to parse {}", config_path.display()))?;
                if let Some(section) = root.simulation {
                    config.apply_section(section)?;
                }
                info!("Loaded configuration from {}", config_path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", config_path.display());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", config_path.display()));
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_section(&mut self, section: SimulationSection) -> Result<()> {
        if let Some(nodes) = section.nodes {
            self.nodes = nodes;
        }
        if let Some(max_edges) = section.max_edges {
            self.max_edges = max_edges;
        }
        if let Some(ceiling) = section.weight_ceiling {
            self.weight_ceiling = ceiling;
        }
        if section.seed.is_some() {
            self.seed = section.seed;
        }
        if let Some(workers) = section.workers {
            self.workers = workers;
        }
        if let Some(capacity) = section.mailbox_capacity {
            self.mailbox_capacity = capacity;
        }
        if let Some(weight) = section.default_link_weight {
            self.default_link_weight = weight;
        }
        if let Some(timeout) = section.discovery_timeout {
            self.discovery_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("invalid discovery_timeout {:?}", timeout))?;
        }
        Ok(())
    }

    /// Apply `LINKSTATE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "NODES", &mut self.nodes);
        override_parsed(&lookup, "MAX_EDGES", &mut self.max_edges);
        override_parsed(&lookup, "WEIGHT_CEILING", &mut self.weight_ceiling);
        override_parsed(&lookup, "WORKERS", &mut self.workers);
        override_parsed(&lookup, "MAILBOX_CAPACITY", &mut self.mailbox_capacity);
        override_parsed(&lookup, "DEFAULT_LINK_WEIGHT", &mut self.default_link_weight);

        let mut seed = 0u64;
        if override_parsed(&lookup, "SEED", &mut seed) {
            self.seed = Some(seed);
        }

        let key = format!("{}DISCOVERY_TIMEOUT", ENV_PREFIX);
        if let Some(raw) = lookup(&key) {
            match humantime::parse_duration(&raw) {
                Ok(timeout) => {
                    self.discovery_timeout = timeout;
                    info!("Discovery timeout overridden by environment: {:?}", timeout);
                }
                Err(e) => warn!("Ignoring {}={:?}: {}", key, raw, e),
            }
        }
    }

    /// Reject settings the simulator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.nodes < 2 {
            bail!("node count must be at least 2, got {}", self.nodes);
        }
        if self.max_edges < MIN_DEGREE_FLOOR {
            bail!(
                "max edges must be at least {}, got {}",
                MIN_DEGREE_FLOOR,
                self.max_edges
            );
        }
        if self.weight_ceiling < 1 {
            bail!("weight ceiling must be at least 1");
        }
        if self.default_link_weight < 1 {
            bail!("default link weight must be at least 1");
        }
        if self.mailbox_capacity < 1 {
            bail!("mailbox capacity must be at least 1");
        }
        Ok(())
    }

    /// Parameters of the random topology to generate
    pub fn topology(&self) -> RandomTopology {
        RandomTopology {
            nodes: self.nodes,
            min_degree: MIN_DEGREE_FLOOR,
            max_degree: self.max_edges,
            weight_ceiling: self.weight_ceiling,
        }
    }

    /// Runtime parameters of the network
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            workers: self.workers,
            mailbox_capacity: self.mailbox_capacity,
            default_link_weight: self.default_link_weight,
            discovery_timeout: self.discovery_timeout,
        }
    }
}

/// Parse `LINKSTATE_<name>` into `slot`, returning whether it was applied
fn override_parsed<F, T>(lookup: &F, name: &str, slot: &mut T) -> bool
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    let Some(raw) = lookup(&key) else {
        return false;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            info!("{} overridden by environment: {:?}", key, value);
            *slot = value;
            true
        }
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.nodes, 10);
        assert_eq!(config.max_edges, 3);
        assert_eq!(config.mailbox_capacity, 1);
        assert_eq!(config.discovery_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
simulation:
  nodes: 25
  max_edges: 4
  seed: 42
  workers: 3
  discovery_timeout: 5s
"#,
        );

        let config = SimConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.nodes, 25);
        assert_eq!(config.max_edges, 4);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.workers, 3);
        assert_eq!(config.weight_ceiling, 20);
        assert_eq!(config.discovery_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig::load_from_file(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.max_edges, SimConfig::default().max_edges);
        assert_eq!(config.weight_ceiling, SimConfig::default().weight_ceiling);
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SimConfig::load_from_file(dir.path()).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_config("simulation:\n  nodes: [not, a, number]\n");
        assert!(SimConfig::load_from_file(file.path()).is_err());

        let file = write_config("simulation:\n  discovery_timeout: soon\n");
        assert!(SimConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("LINKSTATE_NODES", "40"),
            ("LINKSTATE_SEED", "7"),
            ("LINKSTATE_DISCOVERY_TIMEOUT", "250ms"),
            ("LINKSTATE_WORKERS", "many"),
        ]
        .into_iter()
        .collect();

        let mut config = SimConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.nodes, 40);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.discovery_timeout, Duration::from_millis(250));
        // Unparsable values are ignored
        assert_eq!(config.workers, 0);
    }

    #[test]
    fn test_validation() {
        let too_small = SimConfig {
            nodes: 1,
            ..SimConfig::default()
        };
        assert!(too_small.validate().is_err());

        let narrow = SimConfig {
            max_edges: 1,
            ..SimConfig::default()
        };
        assert!(narrow.validate().is_err());

        let no_capacity = SimConfig {
            mailbox_capacity: 0,
            ..SimConfig::default()
        };
        assert!(no_capacity.validate().is_err());

        let weightless = SimConfig {
            default_link_weight: 0,
            ..SimConfig::default()
        };
        assert!(weightless.validate().is_err());
    }

    #[test]
    fn test_conversions() {
        let config = SimConfig {
            nodes: 12,
            max_edges: 5,
            workers: 2,
            ..SimConfig::default()
        };
        let topology = config.topology();
        assert_eq!(topology.nodes, 12);
        assert_eq!(topology.min_degree, MIN_DEGREE_FLOOR);
        assert_eq!(topology.max_degree, 5);

        let network = config.network();
        assert_eq!(network.workers, 2);
        assert_eq!(network.mailbox_capacity, 1);
    }
}
