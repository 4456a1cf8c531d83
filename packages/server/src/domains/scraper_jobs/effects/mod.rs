//! Scraper job effects - background tasks that outlive the request that started them

pub mod monitor;

pub use monitor::{
    monitor_process, record_spawn_failure, CleanExitPolicy, JobOutcome, MonitoredProcess,
    ProcessExit,
};
