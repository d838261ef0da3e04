use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format {0:?}, expected .json or .toml")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Configuration Sections ---

/// Identity-space constants shared by every block.
///
/// A body seen through a periodic face gets its id shifted by
/// `(sx + sy * stride_y + sz * stride_z) * bodies_per_replica`, where `s` is
/// the direction of the crossing on each axis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplicaSettings {
    pub bodies_per_replica: i32,
    #[serde(default = "default_stride_y")]
    pub stride_y: i32,
    #[serde(default = "default_stride_z")]
    pub stride_z: i32,
}

// One replica on either side along x, then along y.
fn default_stride_y() -> i32 { 3 }
fn default_stride_z() -> i32 { 9 }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DomainSettings {
    pub nx: i64,
    pub ny: i64,
    pub nz: i64,
    #[serde(default = "default_periodic")]
    pub periodic: [bool; 3],
    /// Number of blocks along each axis. Each must divide its extent.
    #[serde(default = "default_blocks")]
    pub blocks: [i64; 3],
}

fn default_periodic() -> [bool; 3] { [true, true, true] }
fn default_blocks() -> [i64; 3] { [1, 1, 1] }

impl DomainSettings {
    pub fn extent(&self) -> [i64; 3] {
        [self.nx, self.ny, self.nz]
    }
}

/// The sliding periodic pair at the z extremes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ShearSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Streamwise displacement gained per step, in lattice units.
    #[serde(default)]
    pub velocity: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub steps: u64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub bodies: u32,
    #[serde(default = "default_particles_per_body")]
    pub particles_per_body: u32,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_body_radius")]
    pub body_radius: f64,
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

fn default_dt() -> f64 { 1.0 }
fn default_seed() -> u64 { 42 }
fn default_particles_per_body() -> u32 { 1 }
fn default_max_speed() -> f64 { 0.5 }
fn default_body_radius() -> f64 { 1.0 }
fn default_report_every() -> u64 { 100 }

/// Reservoir slab upstream of the domain's x = 0 face.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PreInletSettings {
    /// Slab thickness along x, in lattice units.
    pub thickness: i64,
    /// Steps between feeds.
    #[serde(default = "default_feed_period")]
    pub period: u64,
    /// Streamwise speed particles are seeded with in the reservoir.
    #[serde(default = "default_inflow_speed")]
    pub inflow_speed: f64,
    #[serde(default)]
    pub bodies: u32,
}

fn default_feed_period() -> u64 { 1 }
fn default_inflow_speed() -> f64 { 0.25 }

// --- Top-Level Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub replica: ReplicaSettings,
    pub domain: DomainSettings,
    #[serde(default)]
    pub shear: ShearSettings,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub run: RunSettings,
    #[serde(default)]
    pub preinlet: Option<PreInletSettings>,
}

fn default_workers() -> usize { 1 }

impl Config {
    pub fn from_json_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let replica = &self.replica;
        if replica.bodies_per_replica <= 0 {
            return Err(ConfigError::Validation("bodies_per_replica must be positive.".to_string()));
        }
        if replica.stride_y <= 0 || replica.stride_z <= 0 {
            return Err(ConfigError::Validation("Replica strides must be positive.".to_string()));
        }

        let domain = &self.domain;
        for (axis, (&n, &b)) in ["x", "y", "z"].iter().zip(domain.extent().iter().zip(domain.blocks.iter())) {
            if n <= 0 {
                return Err(ConfigError::Validation(format!("Domain extent along {} must be positive.", axis)));
            }
            if b <= 0 || n % b != 0 {
                return Err(ConfigError::Validation(format!(
                    "{} blocks do not evenly divide the {} extent {}.",
                    b, axis, n
                )));
            }
        }

        if self.shear.enabled && !domain.periodic[2] {
            return Err(ConfigError::Validation(
                "A sliding boundary needs the z axis to be periodic.".to_string(),
            ));
        }
        if self.shear.enabled && (!domain.periodic[0] || domain.blocks[0] != 1) {
            return Err(ConfigError::Validation(
                "A sliding boundary needs a periodic x axis held by a single block column.".to_string(),
            ));
        }
        if !self.shear.velocity.is_finite() {
            return Err(ConfigError::Validation("Shear velocity must be finite.".to_string()));
        }

        if self.workers == 0 {
            return Err(ConfigError::Validation("Worker count cannot be zero.".to_string()));
        }

        let run = &self.run;
        if run.dt <= 0.0 || !run.dt.is_finite() {
            return Err(ConfigError::Validation("dt must be a positive number.".to_string()));
        }
        if run.particles_per_body == 0 {
            return Err(ConfigError::Validation("particles_per_body cannot be zero.".to_string()));
        }
        if run.bodies > replica.bodies_per_replica as u32 {
            return Err(ConfigError::Validation(format!(
                "{} bodies do not fit in a replica of {}.",
                run.bodies, replica.bodies_per_replica
            )));
        }

        if let Some(preinlet) = &self.preinlet {
            if preinlet.thickness <= 0 {
                return Err(ConfigError::Validation("Pre-inlet thickness must be positive.".to_string()));
            }
            if preinlet.period == 0 {
                return Err(ConfigError::Validation("Pre-inlet feed period cannot be zero.".to_string()));
            }
            if domain.periodic[0] {
                return Err(ConfigError::Validation(
                    "A pre-inlet feeds an open x inlet; x cannot be periodic.".to_string(),
                ));
            }
            if run.bodies as u64 + preinlet.bodies as u64 > replica.bodies_per_replica as u64 {
                return Err(ConfigError::Validation(
                    "Domain and pre-inlet bodies together exceed bodies_per_replica.".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// --- Loading Function ---

/// Loads and validates a `.json` or `.toml` configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    debug!("Parsing {} as {}", path.display(), extension);
    match extension.as_str() {
        "json" => Config::from_json_str(&content),
        "toml" => Config::from_toml_str(&content),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}
