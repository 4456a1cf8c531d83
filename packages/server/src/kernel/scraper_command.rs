//! Typed invocation of the external scraper scripts.
//!
//! The scripts take positional arguments, so each script kind gets its own
//! constructor with typed parameters in argument order:
//!
//! ```text
//! batch:          <interpreter> <script> <search_url> <manufacturer_id> <model_id|""> <job_id>
//! single vehicle: <interpreter> <script> <vehicle_url> <manufacturer_id> <model_id>
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use url::Url;

use crate::common::{ManufacturerId, ModelId, ScraperJobId};
use crate::config::ScraperSettings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Scraper interpreter is not configured")]
    EmptyInterpreter,

    #[error("Scraper script path is not configured")]
    EmptyScript,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Check that a user supplied URL can be handed to a scraper
pub fn validate_scrape_url(raw: &str) -> Result<Url, CommandError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| CommandError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CommandError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// A validated scraper invocation: program, script, then ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperCommand {
    interpreter: String,
    script: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ScraperCommand {
    /// Batch search scraper for one job
    pub fn batch(
        settings: &ScraperSettings,
        search_url: &str,
        manufacturer_id: ManufacturerId,
        model_id: Option<ModelId>,
        job_id: ScraperJobId,
    ) -> Result<Self, CommandError> {
        validate_scrape_url(search_url)?;
        Self::build(
            settings,
            &settings.batch_script,
            vec![
                search_url.trim().to_string(),
                manufacturer_id.to_string(),
                // Unresolved free-text models are passed as an empty argument
                model_id.map(|id| id.to_string()).unwrap_or_default(),
                job_id.to_string(),
            ],
        )
    }

    /// Single vehicle importer. The model must already exist.
    pub fn single_vehicle(
        settings: &ScraperSettings,
        vehicle_url: &str,
        manufacturer_id: ManufacturerId,
        model_id: ModelId,
    ) -> Result<Self, CommandError> {
        validate_scrape_url(vehicle_url)?;
        Self::build(
            settings,
            &settings.single_vehicle_script,
            vec![
                vehicle_url.trim().to_string(),
                manufacturer_id.to_string(),
                model_id.to_string(),
            ],
        )
    }

    fn build(
        settings: &ScraperSettings,
        script: &Path,
        args: Vec<String>,
    ) -> Result<Self, CommandError> {
        if settings.interpreter.trim().is_empty() {
            return Err(CommandError::EmptyInterpreter);
        }
        if script.as_os_str().is_empty() {
            return Err(CommandError::EmptyScript);
        }
        Ok(Self {
            interpreter: settings.interpreter.clone(),
            script: script.to_path_buf(),
            args,
            working_dir: settings.working_dir.clone(),
        })
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Positional arguments after the script path
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Child process with stdin closed and stdout/stderr captured.
    ///
    /// `kill_on_drop` so a dropped monitor never leaks a scraper.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for ScraperCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.interpreter, self.script.display())?;
        for arg in &self.args {
            if arg.is_empty() {
                f.write_str(" ''")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ScraperSettings {
        ScraperSettings {
            interpreter: "python3".to_string(),
            batch_script: PathBuf::from("scrapers/batch.py"),
            single_vehicle_script: PathBuf::from("scrapers/single.py"),
            ..ScraperSettings::default()
        }
    }

    #[test]
    fn test_batch_argument_order() {
        let command = ScraperCommand::batch(
            &settings(),
            "https://example.test/search?x=1",
            ManufacturerId::new(1),
            Some(ModelId::new(9)),
            ScraperJobId::new(42),
        )
        .unwrap();

        assert_eq!(command.script(), Path::new("scrapers/batch.py"));
        assert_eq!(
            command.args(),
            ["https://example.test/search?x=1", "1", "9", "42"]
        );
    }

    #[test]
    fn test_batch_with_unresolved_model_passes_blank() {
        let command = ScraperCommand::batch(
            &settings(),
            "https://example.test/search?x=1",
            ManufacturerId::new(1),
            None,
            ScraperJobId::new(42),
        )
        .unwrap();

        assert_eq!(command.args()[2], "");
        assert_eq!(
            command.to_string(),
            "python3 scrapers/batch.py https://example.test/search?x=1 1 '' 42"
        );
    }

    #[test]
    fn test_single_vehicle_arguments() {
        let command = ScraperCommand::single_vehicle(
            &settings(),
            "https://example.test/car/123",
            ManufacturerId::new(3),
            ModelId::new(17),
        )
        .unwrap();

        assert_eq!(command.script(), Path::new("scrapers/single.py"));
        assert_eq!(command.args(), ["https://example.test/car/123", "3", "17"]);
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let err = ScraperCommand::single_vehicle(
            &settings(),
            "file:///etc/passwd",
            ManufacturerId::new(1),
            ModelId::new(1),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidUrl(_)));

        assert!(validate_scrape_url("not a url").is_err());
    }

    #[test]
    fn test_rejects_missing_script() {
        let mut settings = settings();
        settings.batch_script = PathBuf::new();
        let err = ScraperCommand::batch(
            &settings,
            "https://example.test/search",
            ManufacturerId::new(1),
            None,
            ScraperJobId::new(1),
        )
        .unwrap_err();
        assert_eq!(err, CommandError::EmptyScript);
    }
}
