//! QR credential and device-id allocation configuration.

use serde::{Deserialize, Serialize};

/// QR credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Validity window used when the approver or owner gives none.
    #[serde(default = "default_validity_days")]
    pub default_validity_days: u32,
    /// Longest validity window that may be requested.
    #[serde(default = "default_max_validity_days")]
    pub max_validity_days: u32,
    /// How many fresh device ids to try before giving up on approval.
    #[serde(default = "default_allocation_attempts")]
    pub allocation_attempts: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            default_validity_days: default_validity_days(),
            max_validity_days: default_max_validity_days(),
            allocation_attempts: default_allocation_attempts(),
        }
    }
}

fn default_validity_days() -> u32 {
    365
}

fn default_max_validity_days() -> u32 {
    3650
}

fn default_allocation_attempts() -> u32 {
    5
}
