use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::error::{LensError, LensResult};

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

pub fn success<T>(command: &str, data: T) -> LensResult<SuccessEnvelope>
where
    T: Serialize,
{
    let json_data = serde_json::to_value(data)
        .map_err(|err| LensError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        data: json_data,
    })
}

pub fn failure_from_error(error: &LensError) -> FailureEnvelope {
    FailureEnvelope {
        ok: false,
        error: ErrorContract {
            code: error.code.clone(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        },
        data: error.data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::LensError;

    use super::{failure_from_error, success};

    #[test]
    fn success_wraps_payload_with_api_version() {
        let envelope = success("analyze", json!({ "orders": 3 }));
        assert!(envelope.is_ok());
        if let Ok(value) = envelope {
            assert!(value.ok);
            assert_eq!(value.command, "analyze");
            assert_eq!(value.version, crate::API_VERSION);
            assert_eq!(value.data["orders"], 3);
        }
    }

    #[test]
    fn failure_carries_code_recovery_and_data() {
        let envelope = failure_from_error(&LensError::run_not_found("run_missing"));
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "run_not_found");
        assert!(!envelope.error.recovery_steps.is_empty());
        assert_eq!(
            envelope.data.and_then(|data| data.get("run_id").cloned()),
            Some(json!("run_missing"))
        );
    }
}
