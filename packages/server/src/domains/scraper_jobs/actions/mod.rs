//! Scraper job actions - entry points called by HTTP handlers
//!
//! Actions validate input, talk to the stores through `ServerDeps` and return
//! `ScraperJobResult`. Long-running work is handed to `effects`.

pub mod add_single_vehicle;
pub mod cancel_job;
pub mod list_jobs;
pub mod submit_job;
pub mod sweep_orphans;
pub mod validate_submission;

pub use add_single_vehicle::{add_single_vehicle, AddVehicleRequest, AddedVehicle};
pub use cancel_job::{cancel_job, CANCELLED_BY_USER};
pub use list_jobs::{active_jobs, get_job, list_jobs, RECENT_JOBS_LIMIT};
pub use submit_job::{submit_job, SubmitJobRequest, SubmittedJob, SubmittedJobData};
pub use sweep_orphans::{sweep_orphaned_jobs, ORPHANED_MESSAGE};
pub use validate_submission::{
    validate_submission, ModelSelection, ResolvedModel, SubmissionKind, ValidatedSubmission,
};
