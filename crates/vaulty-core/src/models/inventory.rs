use serde::{Deserialize, Serialize};

/// Output of an inventory-retrieval job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInventory {
    #[serde(rename = "VaultARN", default)]
    pub vault_arn: Option<String>,
    #[serde(rename = "InventoryDate", default)]
    pub inventory_date: Option<String>,
    #[serde(rename = "ArchiveList", default)]
    pub archive_list: Vec<InventoryEntry>,
}

/// One archive listed in a vault inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(rename = "ArchiveId")]
    pub archive_id: String,
    #[serde(rename = "ArchiveDescription", default)]
    pub archive_description: Option<String>,
    #[serde(rename = "CreationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: Option<u64>,
    #[serde(rename = "SHA256TreeHash", default)]
    pub sha256_tree_hash: Option<String>,
}

impl VaultInventory {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
