//! GSTIN verification.
//!
//! A GSTIN is first checked against the registration-number pattern locally.
//! Well-formed numbers are then looked up with the government e-way bill API
//! when credentials are configured; otherwise, or when the lookup fails, a
//! clearly flagged mock answer is returned (`isMock: true`, `isOfficial: false`).

use crate::{config::GstinConfig, errors::ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

static GSTIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z]{1}[1-9A-Z]{1}Z[0-9A-Z]{1}$").unwrap()
});

/// Local format gate; case-sensitive.
pub fn is_valid_format(gstin: &str) -> bool {
    GSTIN_PATTERN.is_match(gstin)
}

#[derive(Debug, Clone, Deserialize)]
pub struct GstinRequest {
    #[serde(default)]
    pub gstin: Option<String>,
}

/// Verification outcome returned to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GstinVerification {
    pub gstin: String,
    pub is_valid: bool,
    pub business_name: Option<String>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub status: Option<String>,
    pub state_code: Option<String>,
    pub pin_code: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub txp_type: Option<String>,
    pub blk_status: Option<String>,
    pub is_official: bool,
    pub is_mock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GstinVerification {
    /// Simulated answer used when the official lookup is unavailable
    pub fn mock(gstin: &str) -> Self {
        Self {
            gstin: gstin.to_string(),
            is_valid: true,
            business_name: Some(format!("Validated Business - {}", gstin)),
            legal_name: Some(format!("Legal Name - {}", gstin)),
            trade_name: Some(format!("Trade Name - {}", gstin)),
            status: Some("ACT".to_string()),
            state_code: Some(gstin.chars().take(2).collect()),
            pin_code: Some("560001".to_string()),
            address1: Some("Mock Address Line 1".to_string()),
            address2: Some("Mock Address Line 2".to_string()),
            txp_type: Some("REG".to_string()),
            blk_status: None,
            is_official: false,
            is_mock: true,
            error: None,
        }
    }

    fn from_upstream(gstin: &str, body: &Value) -> Self {
        let field = |name: &str| match body.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let status = field("status");
        if status.as_deref() != Some("ACT") {
            return Self {
                gstin: gstin.to_string(),
                is_valid: false,
                status,
                is_official: true,
                error: Some("GSTIN not found or inactive in government records".to_string()),
                ..Default::default()
            };
        }

        let legal_name = field("legalName");
        let trade_name = field("tradeName");
        let business_name = trade_name
            .clone()
            .or_else(|| legal_name.clone())
            .or_else(|| Some("Business Name Not Available".to_string()));

        Self {
            gstin: gstin.to_string(),
            is_valid: true,
            business_name,
            legal_name,
            trade_name,
            status,
            state_code: field("stateCode"),
            pin_code: field("pinCode"),
            address1: field("address1"),
            address2: field("address2"),
            txp_type: field("txpType"),
            blk_status: field("blkStatus"),
            is_official: true,
            is_mock: false,
            error: None,
        }
    }
}

/// Client for the e-way bill GSTIN lookup with mock fallback
#[derive(Clone)]
pub struct GstinVerifier {
    client: reqwest::Client,
    config: GstinConfig,
}

impl GstinVerifier {
    pub fn new(config: GstinConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServiceError::InternalError(format!("GSTIN client: {}", e)))?;
        Ok(Self { client, config })
    }

    #[instrument(skip(self))]
    pub async fn verify(&self, raw: &str) -> Result<GstinVerification, ServiceError> {
        let gstin = raw.trim();
        if gstin.is_empty() {
            return Err(ServiceError::missing_field("GSTIN"));
        }
        if !is_valid_format(gstin) {
            return Err(ServiceError::InvalidGstin(
                "GSTIN should be 15 characters long and follow the correct format".to_string(),
            ));
        }

        if !self.config.enabled || !self.config.has_credentials() {
            debug!("GSTIN lookup not configured, using mock verification");
            return Ok(GstinVerification::mock(gstin));
        }

        match self.lookup(gstin).await {
            Ok(verification) => {
                info!(is_valid = verification.is_valid, "GSTIN verified upstream");
                Ok(verification)
            }
            Err(e) => {
                warn!(error = %e, "GSTIN lookup failed, falling back to mock verification");
                Ok(GstinVerification::mock(gstin))
            }
        }
    }

    async fn lookup(&self, gstin: &str) -> Result<GstinVerification, reqwest::Error> {
        let url = format!(
            "{}/Master/GetGSTINDetails",
            self.config.api_url.trim_end_matches('/')
        );
        let header = |value: &Option<String>| value.clone().unwrap_or_default();

        let body: Value = self
            .client
            .get(url)
            .query(&[("GSTIN", gstin)])
            .header("client-id", header(&self.config.client_id))
            .header("client-secret", header(&self.config.client_secret))
            .header("Gstin", header(&self.config.requester_gstin))
            .header("authtoken", header(&self.config.auth_token))
            .header("Content-Type", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(GstinVerification::from_upstream(gstin, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_gate_accepts_canonical_shape() {
        assert!(is_valid_format("22AAAAA0000A1Z5"));
        assert!(is_valid_format("29ABCDE1234F1ZW"));
    }

    #[test]
    fn format_gate_rejects_bad_shapes() {
        assert!(!is_valid_format("22AAAAA0000A1Z"));
        assert!(!is_valid_format("22aaaaa0000a1z5"));
        assert!(!is_valid_format("22AAAAA0000A0Z5"));
        assert!(!is_valid_format("22AAAAA0000A1X5"));
        assert!(!is_valid_format(" 22AAAAA0000A1Z5"));
        assert!(!is_valid_format(""));
    }

    #[test]
    fn format_pattern_compiles() {
        assert!(GSTIN_PATTERN.is_match("27AAPFU0939F1ZV"));
        assert!(GSTIN_PATTERN.as_str().starts_with('^'));
    }

    #[test]
    fn mock_is_flagged_and_derives_state_code() {
        let mock = GstinVerification::mock("27AAAAA0000A1Z5");
        assert!(mock.is_valid);
        assert!(mock.is_mock);
        assert!(!mock.is_official);
        assert_eq!(mock.state_code.as_deref(), Some("27"));
        assert_eq!(
            mock.business_name.as_deref(),
            Some("Validated Business - 27AAAAA0000A1Z5")
        );
    }

    #[test]
    fn upstream_active_record_is_official() {
        let body = json!({
            "status": "ACT",
            "legalName": "Shree Metals Pvt Ltd",
            "tradeName": "",
            "stateCode": 29,
            "pinCode": 560058,
            "txpType": "REG"
        });
        let result = GstinVerification::from_upstream("29ABCDE1234F1Z5", &body);
        assert!(result.is_valid);
        assert!(result.is_official);
        assert!(!result.is_mock);
        assert_eq!(result.business_name.as_deref(), Some("Shree Metals Pvt Ltd"));
        assert_eq!(result.state_code.as_deref(), Some("29"));
        assert_eq!(result.pin_code.as_deref(), Some("560058"));
    }

    #[test]
    fn upstream_inactive_record_is_not_valid() {
        let result =
            GstinVerification::from_upstream("29ABCDE1234F1Z5", &json!({ "status": "CNL" }));
        assert!(!result.is_valid);
        assert!(result.is_official);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn unconfigured_verifier_returns_mock() {
        let verifier = GstinVerifier::new(GstinConfig::default()).unwrap();
        let result = verifier.verify(" 22AAAAA0000A1Z5 ").await.unwrap();
        assert!(result.is_mock);
        assert_eq!(result.gstin, "22AAAAA0000A1Z5");
    }

    #[tokio::test]
    async fn blank_and_malformed_input_fail_fast() {
        let verifier = GstinVerifier::new(GstinConfig::default()).unwrap();
        assert!(matches!(
            verifier.verify("  ").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            verifier.verify("22aaaaa0000a1z5").await,
            Err(ServiceError::InvalidGstin(_))
        ));
    }
}
