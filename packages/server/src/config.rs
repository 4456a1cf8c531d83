use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::scraper_jobs::CleanExitPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub scraper: ScraperSettings,
    /// Mark jobs left pending/running by a previous server process as failed on startup
    pub sweep_orphaned_jobs: bool,
}

/// How scraper child processes are launched and supervised.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Program that runs the scraper scripts (`python3` in production)
    pub interpreter: String,
    /// Working directory for child processes; scripts are resolved relative to it
    pub working_dir: Option<PathBuf>,
    pub batch_script: PathBuf,
    pub single_vehicle_script: PathBuf,
    /// Upper bound on simultaneously running batch jobs (unbounded when None)
    pub max_concurrent_jobs: Option<usize>,
    pub single_vehicle_timeout: Duration,
    /// How long a cancelled child gets between SIGTERM and SIGKILL
    pub termination_grace: Duration,
    pub clean_exit_policy: CleanExitPolicy,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            working_dir: None,
            batch_script: PathBuf::from("scrapers/scraper_working_pattern.py"),
            single_vehicle_script: PathBuf::from("scrapers/scraper_single_vehicle.py"),
            max_concurrent_jobs: None,
            single_vehicle_timeout: Duration::from_secs(300),
            termination_grace: Duration::from_secs(10),
            clean_exit_policy: CleanExitPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = ScraperSettings::default();

        let max_concurrent_jobs = match env::var("MAX_CONCURRENT_SCRAPER_JOBS") {
            Ok(raw) => Some(
                raw.parse::<usize>()
                    .context("MAX_CONCURRENT_SCRAPER_JOBS must be a positive number")?,
            )
            .filter(|n| *n > 0),
            Err(_) => None,
        };

        let scraper = ScraperSettings {
            interpreter: env::var("SCRAPER_INTERPRETER").unwrap_or(defaults.interpreter),
            working_dir: env::var("SCRAPER_WORKDIR").ok().map(PathBuf::from),
            batch_script: env::var("BATCH_SCRAPER_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.batch_script),
            single_vehicle_script: env::var("SINGLE_VEHICLE_SCRAPER_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.single_vehicle_script),
            max_concurrent_jobs,
            single_vehicle_timeout: Duration::from_secs(
                env::var("SINGLE_VEHICLE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("SINGLE_VEHICLE_TIMEOUT_SECS must be a valid number")?,
            ),
            termination_grace: Duration::from_secs(
                env::var("SCRAPER_TERMINATION_GRACE_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("SCRAPER_TERMINATION_GRACE_SECS must be a valid number")?,
            ),
            clean_exit_policy: match env::var("SCRAPER_CLEAN_EXIT_POLICY") {
                Ok(raw) => CleanExitPolicy::from_str(&raw)?,
                Err(_) => defaults.clean_exit_policy,
            },
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:3001".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            scraper,
            sweep_orphaned_jobs: env::var("SWEEP_ORPHANED_JOBS")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
                .unwrap_or(true),
        })
    }
}
