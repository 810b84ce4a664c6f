//! Per-index worker profiles the panel front end edits.
//!
//! The orchestrator never reads this store; routes look a profile up and
//! turn it plus an action into a [`WorkerRequest`]. Profiles are numbered
//! 1 through 8 and persisted as a single JSON file under the config dir.

use crate::error::{FileError, RequestError};
use crate::lifecycle::{WorkerAction, WorkerRequest};
use crate::{Result, env};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAX_SERVERS: u8 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub real_full_path: PathBuf,
    pub port: u16,
    #[serde(default)]
    pub ip_for_run: String,
    /// Opaque strategy string handed to the worker verbatim.
    #[serde(default)]
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file_name: Option<String>,
}

impl ServerProfile {
    pub fn to_request(&self, action: WorkerAction) -> WorkerRequest {
        WorkerRequest {
            action,
            real_full_path: self.real_full_path.clone(),
            port: self.port,
            arguments: self.arguments.clone(),
            hosts_file_name: self.hosts_file_name.clone(),
            ip_for_run: self.ip_for_run.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServersFile {
    #[serde(default)]
    pub servers: IndexMap<u8, ServerProfile>,
    #[serde(skip)]
    path: PathBuf,
}

pub fn validate_index(index: u8) -> std::result::Result<(), RequestError> {
    if index < 1 || index > MAX_SERVERS {
        return Err(RequestError::BadServerIndex { index });
    }
    Ok(())
}

impl ServersFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            servers: Default::default(),
            path,
        }
    }

    pub fn load() -> Result<Self> {
        Self::read(&*env::SHAPERCTL_SERVERS_FILE)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new(path.to_path_buf()));
        }
        let _lock = xx::fslock::get(path, false)?;
        let raw = xx::file::read_to_string(path).unwrap_or_else(|e| {
            warn!("Error reading servers file {path:?}: {e}");
            String::new()
        });
        let mut file: Self = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Error parsing servers file {path:?}: {e}");
            Self::new(path.to_path_buf())
        });
        file.path = path.to_path_buf();
        Ok(file)
    }

    pub fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            xx::file::mkdirp(parent)?;
        }
        let _lock = xx::fslock::get(&self.path, false)?;
        let raw = serde_json::to_string_pretty(self).map_err(|e| FileError::SerializeError {
            path: self.path.clone(),
            source: e,
        })?;
        xx::file::write(&self.path, raw).map_err(|e| FileError::WriteError {
            path: self.path.clone(),
            details: Some(e.to_string()),
        })?;
        Ok(())
    }

    pub fn get(&self, index: u8) -> std::result::Result<&ServerProfile, RequestError> {
        validate_index(index)?;
        self.servers
            .get(&index)
            .ok_or(RequestError::UnknownServer { index })
    }

    pub fn set(
        &mut self,
        index: u8,
        profile: ServerProfile,
    ) -> std::result::Result<(), RequestError> {
        validate_index(index)?;
        self.servers.insert(index, profile);
        self.servers.sort_keys();
        Ok(())
    }
}
