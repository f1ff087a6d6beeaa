//! Gaming device models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a device. `InUse` is owned by the session manager;
/// operators may only toggle between `Available` and `OutOfService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
    Available,
    InUse,
    OutOfService,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Available => "available",
            DeviceStatus::InUse => "inUse",
            DeviceStatus::OutOfService => "outOfService",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(DeviceStatus::Available),
            "inUse" => Some(DeviceStatus::InUse),
            "outOfService" => Some(DeviceStatus::OutOfService),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rentable gaming device (console, PC, table)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub category: String,
    pub external_tag: Option<String>,
    pub status: String,
    pub default_minutes: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Device {
    pub fn status(&self) -> Option<DeviceStatus> {
        DeviceStatus::parse(&self.status)
    }

    pub fn is_available(&self) -> bool {
        self.status == DeviceStatus::Available.as_str()
    }
}

/// Request to create a device
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub external_tag: Option<String>,
    #[serde(default = "default_session_minutes")]
    pub default_minutes: i64,
}

fn default_session_minutes() -> i64 {
    60
}

/// Request to update a device
#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub external_tag: Option<String>,
    pub default_minutes: Option<i64>,
    /// Only available <-> outOfService transitions are accepted here
    pub status: Option<DeviceStatus>,
}
