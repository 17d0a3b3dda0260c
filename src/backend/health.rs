//! Backend health probe.

use serde::Deserialize;

use super::ensure_success;
use crate::error::Result;
use crate::routes::{HEALTH_PATH, RouteTable};

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Probe the backend health endpoint.
pub async fn check_health(http: &reqwest::Client, routes: &RouteTable) -> Result<HealthStatus> {
    let url = routes.resolve(HEALTH_PATH)?;
    let response = http.get(url).send().await?;
    let status: HealthStatus = ensure_success(response).await?.json().await?;

    tracing::debug!(name: "backend.health", status = %status.status, "Health probe answered");
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ok() {
        let status: HealthStatus = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(status.is_ok());
        let status: HealthStatus = serde_json::from_str(r#"{"status":"degraded"}"#).unwrap();
        assert!(!status.is_ok());
    }
}
