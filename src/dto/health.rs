use serde::Serialize;
use utoipa::ToSchema;

/// Whether the game store is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Body returned by the `/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl From<bool> for HealthResponse {
    /// Build from the degraded flag.
    fn from(degraded: bool) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase_status() {
        let ok = serde_json::to_value(HealthResponse::from(false)).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "ok"}));
        let degraded = serde_json::to_value(HealthResponse::from(true)).unwrap();
        assert_eq!(degraded, serde_json::json!({"status": "degraded"}));
    }
}
