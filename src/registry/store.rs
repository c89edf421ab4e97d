//! JSON-file backed server registry.
//!
//! The whole mapping is kept in memory behind a `RwLock`; every successful
//! `upsert` rewrites the file while still holding the write guard, so writers
//! never interleave and readers never observe a half-applied change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::common::error::{RegistryError, RegistryResult};
use crate::common::types::{ServerEntry, StoredAddress};

/// On-disk form of one entry.
///
/// Older files stored `[host, port]` pairs; those are still accepted and are
/// rewritten as objects on the next save.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Object(StoredAddress),
    Legacy((String, u32)),
}

impl StoredRecord {
    fn into_address(self) -> StoredAddress {
        match self {
            Self::Object(address) => address,
            Self::Legacy((host, port)) => StoredAddress { host, port },
        }
    }
}

type Entries = BTreeMap<String, ServerEntry>;

/// Persistent name -> address registry.
pub struct RegistryStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl RegistryStore {
    /// Load the registry from `path`. A missing file yields an empty registry.
    pub async fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let entries = load(&path).await?;
        info!("Loaded {} linked server(s) from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Validate and insert (or replace) `name`, then persist the registry.
    ///
    /// If persisting fails the in-memory registry is left untouched.
    pub async fn upsert(&self, name: &str, host: &str, port: u32) -> RegistryResult<ServerEntry> {
        let entry = ServerEntry::new(name, host, port)?;

        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        if let Some(previous) = updated.insert(entry.name.clone(), entry.clone()) {
            debug!("Replacing {} ({})", previous.name, previous.address());
        }

        save(&self.path, &updated).await?;
        *entries = updated;

        info!("Linked {}", entry);
        Ok(entry)
    }

    /// Look up a single entry.
    pub async fn get(&self, name: &str) -> RegistryResult<ServerEntry> {
        self.entries
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Snapshot of all entries, ordered by name.
    pub async fn list(&self) -> Vec<ServerEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

/// Read and validate the registry file.
pub async fn load(path: &Path) -> RegistryResult<Entries> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Registry file {} does not exist yet", path.display());
            return Ok(Entries::new());
        }
        Err(source) => {
            return Err(RegistryError::Persistence {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let corrupt = |message: String| RegistryError::CorruptData {
        path: path.to_path_buf(),
        message,
    };

    let raw: BTreeMap<String, StoredRecord> =
        serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

    let mut entries = Entries::new();
    for (name, record) in raw {
        let address = record.into_address();
        let entry = ServerEntry::new(name.clone(), address.host, address.port)
            .map_err(|e| corrupt(format!("entry `{}`: {}", name, e)))?;
        entries.insert(name, entry);
    }

    Ok(entries)
}

/// Atomically replace the registry file with `entries`.
///
/// Writes a sibling temp file, fsyncs it and renames it over the target.
pub async fn save(path: &Path, entries: &Entries) -> RegistryResult<()> {
    let persistence = |source: std::io::Error| RegistryError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let records: BTreeMap<&str, StoredAddress> = entries
        .values()
        .map(|entry| {
            (
                entry.name.as_str(),
                StoredAddress {
                    host: entry.host.clone(),
                    port: entry.port as u32,
                },
            )
        })
        .collect();
    let json = serde_json::to_vec_pretty(&records)
        .map_err(|e| persistence(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("servers.json");
    let tmp_path = dir.join(format!(".{}.tmp-{}", base, std::process::id()));

    let result: std::io::Result<()> = async {
        let mut tmp = fs::File::create(&tmp_path).await?;
        tmp.write_all(&json).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
            }
        }
        return Err(persistence(e));
    }

    debug!("Saved {} entries to {}", entries.len(), path.display());
    Ok(())
}
