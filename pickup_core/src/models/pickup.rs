//! Pickup request records and the payloads that create or change them

use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

pub const DEFAULT_DEVICE: &str = "unknown";
pub const DEFAULT_QUANTITY: u32 = 1;

const REQUIRED_FIELDS: [&str; 3] = ["name", "phone", "address"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum RequestStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::InProgress => "In Progress",
            RequestStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    /// Accepts the canonical spellings in any case, with `-` or `_` standing in for the space.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "in progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            _ => {
                let expected: Vec<&str> = RequestStatus::ALL.iter().map(RequestStatus::as_str).collect();
                Err(AppError::Validation(format!(
                    "invalid status '{}', expected one of: {}",
                    s,
                    expected.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupRequest {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: String,
    #[serde(default = "default_device", deserialize_with = "lenient_device")]
    pub device: String,
    #[serde(default = "default_quantity", deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: RequestStatus,
    /// Milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: i64,
}

impl PickupRequest {
    pub fn from_new(id: String, input: NewPickupRequest, created_at: i64) -> Self {
        Self {
            id,
            name: input.name,
            phone: input.phone,
            address: input.address,
            device: input.device,
            quantity: input.quantity,
            date: input.date,
            status: RequestStatus::Pending,
            created_at,
        }
    }
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_quantity() -> u32 {
    DEFAULT_QUANTITY
}

// Stored records written by older clients may carry numbers where text is
// expected, or arbitrary status strings. Those are coerced on read instead of
// failing the whole collection.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_text(&value)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| serde::de::Error::custom("request id must be a non-empty string or number"))
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value).unwrap_or_default())
}

fn lenient_device<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(default_device))
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value).filter(|d| !d.is_empty()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or_default())
}

fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<RequestStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

fn lenient_quantity<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(quantity_from_value).unwrap_or(DEFAULT_QUANTITY))
}

/// Reads a positive quantity from a JSON number or numeric string.
/// Anything else, including zero and negatives, yields the default of 1.
pub fn quantity_from_value(value: &Value) -> u32 {
    let as_whole = |f: f64| Some(f).filter(|f| f.is_finite() && *f >= 1.0).map(|f| f.trunc() as u64);

    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(as_whole)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(as_whole),
        _ => None,
    };

    parsed
        .filter(|q| *q > 0)
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
        .unwrap_or(DEFAULT_QUANTITY)
}

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Body of `POST /api/requests`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePickupRequest {
    #[validate(required(message = "name is required"))]
    #[validate(custom(function = "validate_not_blank", message = "name is required"))]
    pub name: Option<String>,

    #[validate(required(message = "phone is required"))]
    #[validate(custom(function = "validate_not_blank", message = "phone is required"))]
    pub phone: Option<String>,

    #[validate(required(message = "address is required"))]
    #[validate(custom(function = "validate_not_blank", message = "address is required"))]
    pub address: Option<String>,

    pub device: Option<String>,

    pub quantity: Option<Value>,

    pub date: Option<String>,
}

impl CreatePickupRequest {
    /// Checks the required fields and applies defaults to the optional ones.
    pub fn into_new_request(self) -> Result<NewPickupRequest> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            let missing: Vec<&str> = REQUIRED_FIELDS
                .iter()
                .copied()
                .filter(|field| field_errors.contains_key(*field))
                .collect();
            return Err(AppError::Validation(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        // Validation above guarantees these are present and not blank.
        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();

        Ok(NewPickupRequest {
            name: trimmed(self.name),
            phone: trimmed(self.phone),
            address: trimmed(self.address),
            device: non_empty(self.device).unwrap_or_else(default_device),
            quantity: self
                .quantity
                .as_ref()
                .map(quantity_from_value)
                .unwrap_or(DEFAULT_QUANTITY),
            date: non_empty(self.date),
        })
    }
}

/// A validated submission with defaults applied, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPickupRequest {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub device: String,
    pub quantity: u32,
    pub date: Option<String>,
}

/// Body of `PUT /api/requests/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePickupRequest {
    pub status: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
}

impl UpdatePickupRequest {
    /// Drops absent or empty fields and rejects unknown status values.
    pub fn into_changes(self) -> Result<PickupChanges> {
        let status = non_empty(self.status)
            .map(|s| s.parse::<RequestStatus>())
            .transpose()?;

        Ok(PickupChanges {
            status,
            address: non_empty(self.address),
            date: non_empty(self.date),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickupChanges {
    pub status: Option<RequestStatus>,
    pub address: Option<String>,
    pub date: Option<String>,
}

impl PickupChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.address.is_none() && self.date.is_none()
    }

    pub fn apply(&self, request: &mut PickupRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(address) = &self.address {
            request.address = address.clone();
        }
        if let Some(date) = &self.date {
            request.date = Some(date.clone());
        }
    }
}
