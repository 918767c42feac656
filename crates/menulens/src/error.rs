use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const SOURCE_HELP_SECTION_TITLE: &str = "Source File Troubleshooting";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LensError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl LensError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source_help_data(self, data: Value) -> Self {
        self.with_data(merge_source_help_data(data))
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(
            "invalid_argument",
            message,
            vec!["Check the analysis options passed to the pipeline.".to_string()],
        )
    }

    pub fn source_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "source_unreadable",
            &format!("Could not read transaction source `{location}`: {detail}"),
            vec![
                "Verify the path exists and is readable.".to_string(),
                "Rerun the analysis once the file is in place.".to_string(),
            ],
        )
        .with_source_help_data(json!({
            "path": location,
        }))
    }

    pub fn source_empty(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "source_empty",
            &format!("Transaction source `{location}` has no header row."),
            vec!["Export the POS report again including its header row.".to_string()],
        )
        .with_source_help_data(json!({
            "path": location,
        }))
    }

    pub fn source_schema_mismatch(
        path: &Path,
        required_headers: Vec<String>,
        actual_headers: Vec<String>,
    ) -> Self {
        let location = path.display().to_string();
        Self::new(
            "source_schema_mismatch",
            &format!("CSV headers in `{location}` do not satisfy the transaction schema."),
            vec![
                "Include an order id, item list, order total and timestamp column.".to_string(),
                "Header names are matched against the POS export aliases.".to_string(),
            ],
        )
        .with_source_help_data(json!({
            "path": location,
            "required_headers": required_headers,
            "actual_headers": actual_headers,
        }))
    }

    pub fn duplicate_source(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "duplicate_source",
            &format!("Transaction source `{location}` was passed more than once."),
            vec!["Pass each export file exactly once.".to_string()],
        )
        .with_source_help_data(json!({
            "path": location,
        }))
    }

    pub fn no_sources() -> Self {
        Self::new(
            "no_sources",
            "No transaction sources were provided.",
            vec!["Pass at least one POS export CSV path.".to_string()],
        )
    }

    pub fn catalog_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "catalog_unreadable",
            &format!("Could not read menu catalog `{location}`: {detail}"),
            vec!["Verify the price list path exists and is readable.".to_string()],
        )
        .with_data(json!({
            "path": location,
        }))
    }

    pub fn catalog_schema_mismatch(path: &Path, actual_headers: Vec<String>) -> Self {
        let location = path.display().to_string();
        Self::new(
            "catalog_schema_mismatch",
            &format!("Menu catalog `{location}` needs a name and a price column."),
            vec![
                "Include `Name` and `Price` headers.".to_string(),
                "`Category` and `Is Alcohol` are optional.".to_string(),
            ],
        )
        .with_data(json!({
            "path": location,
            "required_headers": ["Name", "Price"],
            "optional_headers": ["Category", "Is Alcohol"],
            "actual_headers": actual_headers,
        }))
    }

    pub fn config_invalid(message: &str) -> Self {
        Self::new(
            "config_invalid",
            message,
            vec![
                "Fix the analysis configuration file.".to_string(),
                "Omit a field to fall back to its default.".to_string(),
            ],
        )
    }

    pub fn config_unreadable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::config_invalid(&format!(
            "Could not load analysis configuration `{location}`: {detail}"
        ))
        .with_data(json!({
            "path": location,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn store_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_permission_denied",
            &format!("Cannot initialize analysis store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `MENULENS_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Analysis store is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Analysis store appears corrupt at `{location}`."),
            vec![format!(
                "Move `{location}` aside; a fresh store is created on the next run."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Analysis store operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn run_not_found(run_id: &str) -> Self {
        Self::new(
            "run_not_found",
            &format!("Analysis run `{run_id}` was not found."),
            vec!["Persist a run first, then load it by the returned run id.".to_string()],
        )
        .with_data(json!({
            "run_id": run_id,
        }))
    }
}

fn merge_source_help_data(mut data: Value) -> Value {
    if !data.is_object() {
        data = json!({});
    }

    if let Some(object) = data.as_object_mut() {
        object.insert(
            "help_section_title".to_string(),
            Value::String(SOURCE_HELP_SECTION_TITLE.to_string()),
        );
    }

    data
}

pub type LensResult<T> = Result<T, LensError>;
