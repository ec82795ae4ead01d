use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Platforms whose video libraries can be archived.
///
/// Each platform has its own provider account, so it selects both the access token and
/// the default vault name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    OpenHpi,
    OpenSap,
    MoocHouse,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::OpenHpi, Platform::OpenSap, Platform::MoocHouse];

    /// Vault used when no explicit vault name is given: `videos_{platform}`.
    pub fn default_vault_name(&self) -> String {
        format!("videos_{}", self)
    }

    /// Environment variable holding the provider access token for this platform.
    pub fn token_env_var(&self) -> String {
        format!("VIMEO_ACCESS_TOKEN_{}", self.to_string().to_uppercase())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openhpi" => Ok(Platform::OpenHpi),
            "opensap" => Ok(Platform::OpenSap),
            "moochouse" => Ok(Platform::MoocHouse),
            _ => Err(anyhow::anyhow!("Invalid platform: {}", s)),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Platform::OpenHpi => write!(f, "openhpi"),
            Platform::OpenSap => write!(f, "opensap"),
            Platform::MoocHouse => write!(f, "moochouse"),
        }
    }
}
