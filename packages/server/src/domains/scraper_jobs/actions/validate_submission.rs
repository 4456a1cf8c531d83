//! Shared validation for batch jobs and single-vehicle imports.
//!
//! Read-only: nothing is written while validating, so a rejected submission
//! leaves no trace.

use serde::Deserialize;

use crate::common::{ManufacturerId, ModelId};
use crate::domains::catalog::models::{Manufacturer, VehicleModel};
use crate::domains::scraper_jobs::error::{ScraperJobError, ScraperJobResult};
use crate::kernel::{validate_scrape_url, BaseCatalog};

/// Caller's model choice: an existing id, or a free-text name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSelection {
    pub model_id: Option<ModelId>,
    pub model_name: Option<String>,
}

impl ModelSelection {
    pub fn by_id(id: ModelId) -> Self {
        Self {
            model_id: Some(id),
            model_name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            model_id: None,
            model_name: Some(name.into()),
        }
    }

    fn name(&self) -> Option<&str> {
        self.model_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    BatchSearch,
    SingleVehicle,
}

impl SubmissionKind {
    fn missing_fields_message(&self) -> &'static str {
        match self {
            SubmissionKind::BatchSearch => "Search URL and manufacturer are required",
            SubmissionKind::SingleVehicle => "URL and manufacturer are required",
        }
    }
}

/// Model after lookup
#[derive(Debug, Clone)]
pub enum ResolvedModel {
    Existing(VehicleModel),
    /// Free-text name with no matching row for this manufacturer
    Unresolved(String),
}

impl ResolvedModel {
    pub fn id(&self) -> Option<ModelId> {
        match self {
            ResolvedModel::Existing(model) => Some(model.id),
            ResolvedModel::Unresolved(_) => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ResolvedModel::Existing(model) => &model.name,
            ResolvedModel::Unresolved(name) => name,
        }
    }
}

enum ModelChoice<'a> {
    Id(ModelId),
    Name(&'a str),
}

#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub url: String,
    pub manufacturer: Manufacturer,
    pub model: ResolvedModel,
}

/// Check required fields, then resolve manufacturer and model.
///
/// When both `model_id` and `model_name` are given the id wins.
pub async fn validate_submission(
    catalog: &dyn BaseCatalog,
    kind: SubmissionKind,
    url: Option<&str>,
    manufacturer_id: Option<ManufacturerId>,
    model: &ModelSelection,
) -> ScraperJobResult<ValidatedSubmission> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    let (Some(url), Some(manufacturer_id)) = (url, manufacturer_id) else {
        return Err(ScraperJobError::validation(kind.missing_fields_message()));
    };

    let choice = match (model.model_id, model.name()) {
        (Some(model_id), _) => ModelChoice::Id(model_id),
        (None, Some(name)) => ModelChoice::Name(name),
        (None, None) => {
            return Err(ScraperJobError::validation(
                "Either select a model or provide a custom model name",
            ))
        }
    };

    validate_scrape_url(url).map_err(|e| ScraperJobError::validation(e.to_string()))?;

    let manufacturer = catalog
        .find_manufacturer(manufacturer_id)
        .await?
        .ok_or_else(|| ScraperJobError::validation("Invalid manufacturer ID"))?;

    let model = match choice {
        ModelChoice::Id(model_id) => catalog
            .find_model_for_manufacturer(model_id, manufacturer_id)
            .await?
            .map(ResolvedModel::Existing)
            .ok_or_else(|| {
                ScraperJobError::validation("Invalid model ID for the given manufacturer")
            })?,
        ModelChoice::Name(name) => match catalog.find_model_by_name(manufacturer_id, name).await? {
            Some(existing) => ResolvedModel::Existing(existing),
            None => ResolvedModel::Unresolved(name.to_string()),
        },
    };

    Ok(ValidatedSubmission {
        url: url.to_string(),
        manufacturer,
        model,
    })
}
