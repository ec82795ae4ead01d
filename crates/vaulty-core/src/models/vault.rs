use serde::{Deserialize, Serialize};

/// Summary of an archive vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub vault_name: String,
    pub vault_arn: Option<String>,
    pub creation_date: Option<String>,
    pub number_of_archives: i64,
    pub size_in_bytes: i64,
}

/// Summary of a job known to a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub action: Option<String>,
    pub status_code: Option<String>,
    pub completed: bool,
    pub creation_date: Option<String>,
    pub completion_date: Option<String>,
}

/// Receipt returned by an archive upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReceipt {
    pub archive_id: String,
    pub checksum: Option<String>,
    pub location: Option<String>,
}

/// Receipt returned by an object store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReceipt {
    pub container: String,
    pub key: String,
    pub e_tag: Option<String>,
}
