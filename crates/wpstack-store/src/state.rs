use crate::layout::ProjectLayout;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use wpstack_schema::{write_atomic, Fingerprint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EnvState {
    Absent,
    Created,
    Stopped,
    Starting,
    DegradedWait,
    Ready,
    Stopping,
}

impl std::fmt::Display for EnvState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvState::Absent => write!(f, "absent"),
            EnvState::Created => write!(f, "created"),
            EnvState::Stopped => write!(f, "stopped"),
            EnvState::Starting => write!(f, "starting"),
            EnvState::DegradedWait => write!(f, "degraded-wait"),
            EnvState::Ready => write!(f, "ready"),
            EnvState::Stopping => write!(f, "stopping"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvRecord {
    pub state: EnvState,
    pub updated_at: String,
    /// Fingerprint of the descriptor last written to disk.
    #[serde(default)]
    pub descriptor: Option<Fingerprint>,
    /// When the database last answered a readiness query. Cleared by `up`
    /// and `down`, so its presence means "answered since the most recent up".
    #[serde(default)]
    pub db_ready_at: Option<String>,
    /// blake3 checksum for integrity verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl EnvRecord {
    pub fn new(state: EnvState) -> Self {
        Self {
            state,
            updated_at: chrono::Utc::now().to_rfc3339(),
            descriptor: None,
            db_ready_at: None,
            checksum: None,
        }
    }

    fn compute_checksum(&self) -> Result<String, StoreError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Persists the lifecycle record under the project's state directory.
pub struct StateStore {
    layout: ProjectLayout,
}

impl StateStore {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Current record. A project without a record is `Absent`, or `Created`
    /// when its configuration already exists.
    pub fn get(&self) -> Result<EnvRecord, StoreError> {
        let path = self.layout.state_file();
        if !path.exists() {
            let state = if self.layout.is_created() {
                EnvState::Created
            } else {
                EnvState::Absent
            };
            return Ok(EnvRecord::new(state));
        }
        let content = fs::read_to_string(&path)?;
        let record: EnvRecord = serde_json::from_str(&content)?;

        if let Some(ref expected) = record.checksum {
            let actual = record.compute_checksum()?;
            if actual != *expected {
                return Err(StoreError::IntegrityFailure {
                    path: path.display().to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(record)
    }

    pub fn put(&self, record: &EnvRecord) -> Result<(), StoreError> {
        let mut with_checksum = record.clone();
        with_checksum.checksum = Some(with_checksum.compute_checksum()?);
        let content = serde_json::to_string_pretty(&with_checksum)?;
        write_atomic(&self.layout.state_file(), &content)?;
        Ok(())
    }

    pub fn update_state(&self, new_state: EnvState) -> Result<EnvRecord, StoreError> {
        let mut record = self.get()?;
        record.state = new_state;
        record.updated_at = chrono::Utc::now().to_rfc3339();
        if matches!(new_state, EnvState::Starting | EnvState::Stopped) {
            record.db_ready_at = None;
        }
        self.put(&record)?;
        Ok(record)
    }

    pub fn mark_db_ready(&self) -> Result<EnvRecord, StoreError> {
        let mut record = self.get()?;
        let now = chrono::Utc::now().to_rfc3339();
        record.db_ready_at = Some(now.clone());
        record.updated_at = now;
        self.put(&record)?;
        Ok(record)
    }

    pub fn set_descriptor(&self, fingerprint: Fingerprint) -> Result<(), StoreError> {
        let mut record = self.get()?;
        record.descriptor = Some(fingerprint);
        self.put(&record)
    }
}
