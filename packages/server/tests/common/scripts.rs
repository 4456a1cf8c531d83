//! Scraper stand-ins: small `sh` scripts in a temp dir, run against the in-memory store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use marketplace_core::config::ScraperSettings;
use marketplace_core::domains::scraper_jobs::{CleanExitPolicy, JobOutcome};
use marketplace_core::kernel::{InMemoryStore, ServerDeps};
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Keeps running until SIGTERM; records each signal it receives
pub const WAITS_FOR_SIGTERM: &str = r#"
trap 'echo term >> signals.txt; exit 143' TERM
echo started > started.txt
while true; do sleep 0.05; done
"#;

/// Ignores SIGTERM, so only SIGKILL stops it
pub const IGNORES_SIGTERM: &str = r#"
trap '' TERM
echo started > started.txt
while true; do sleep 0.05; done
"#;

/// Writes its positional arguments one per line, then exits 0
pub const RECORDS_ARGS: &str = r#"
printf '%s\n' "$@" > args.txt
"#;

pub const MANUFACTURER_ID: i32 = 1;
pub const OTHER_MANUFACTURER_ID: i32 = 2;
pub const MODEL_ID: i32 = 7;
pub const OTHER_MODEL_ID: i32 = 8;

pub fn seeded_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_manufacturer(MANUFACTURER_ID, "Toyota")
        .with_manufacturer(OTHER_MANUFACTURER_ID, "Nissan")
        .with_model(MODEL_ID, MANUFACTURER_ID, "Land Cruiser")
        .with_model(OTHER_MODEL_ID, OTHER_MANUFACTURER_ID, "Patrol")
}

/// Temp working dir with `batch.sh` and `single.sh`, wired into `ServerDeps`.
pub struct ScraperFixture {
    pub dir: TempDir,
    pub store: InMemoryStore,
    pub deps: ServerDeps,
}

impl ScraperFixture {
    pub fn new(batch_script: &str, single_script: &str) -> Self {
        Self::with_settings(batch_script, single_script, |_| {})
    }

    pub fn with_settings(
        batch_script: &str,
        single_script: &str,
        configure: impl FnOnce(&mut ScraperSettings),
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("batch.sh"), batch_script).expect("Failed to write script");
        std::fs::write(dir.path().join("single.sh"), single_script)
            .expect("Failed to write script");

        let mut settings = ScraperSettings {
            interpreter: "sh".to_string(),
            working_dir: Some(dir.path().to_path_buf()),
            batch_script: dir.path().join("batch.sh"),
            single_vehicle_script: dir.path().join("single.sh"),
            max_concurrent_jobs: None,
            single_vehicle_timeout: Duration::from_secs(10),
            termination_grace: Duration::from_secs(5),
            clean_exit_policy: CleanExitPolicy::Finalize,
        };
        configure(&mut settings);

        let store = seeded_store();
        let deps = ServerDeps::new(Arc::new(store.clone()), Arc::new(store.clone()), settings);

        Self { dir, store, deps }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    pub fn touch(&self, name: &str) {
        std::fs::write(self.path(name), "").expect("Failed to create file");
    }

    /// Poll until the script creates `name`
    pub async fn wait_for_file(&self, name: &str) {
        let path = self.path(name);
        tokio::time::timeout(Duration::from_secs(10), async {
            while !path.exists() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} was never created", name));
    }
}

pub async fn wait_outcome(outcome: oneshot::Receiver<JobOutcome>) -> JobOutcome {
    tokio::time::timeout(Duration::from_secs(15), outcome)
        .await
        .expect("Job did not finish in time")
        .expect("Monitor dropped the outcome channel")
}
