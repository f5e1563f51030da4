//! Persistence of compiled stores.
//!
//! Provides binary encoding via `bitcode` with a versioned header, and the
//! [`PersistenceSink`] trait through which a session hands over each
//! frozen store.

use crate::messages::Messages;
use crate::store::FrozenStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a compiled store snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x9B5C_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("header claims {expected} records, payload has {actual}")]
    RecordCount { expected: u64, actual: u64 },
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every encoded store. Enables format detection and
/// version checking before the payload is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Output key the store was persisted under.
    pub key: String,
    pub record_count: u64,
}

impl SnapshotHeader {
    pub fn new(key: impl Into<String>, record_count: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            key: key.into(),
            record_count,
        }
    }

    pub fn validate(&self) -> Result<(), PersistError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(PersistError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(PersistError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    header: SnapshotHeader,
    store: FrozenStore,
}

/// Encode a frozen store with a versioned header.
pub fn encode_store(key: &str, store: &FrozenStore) -> Result<Vec<u8>, PersistError> {
    let snapshot = StoreSnapshot {
        header: SnapshotHeader::new(key, store.len() as u64),
        store: store.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| PersistError::Encode(e.to_string()))
}

/// Decode a store encoded by [`encode_store`], validating its header.
pub fn decode_store(data: &[u8]) -> Result<(SnapshotHeader, FrozenStore), PersistError> {
    let snapshot: StoreSnapshot =
        bitcode::deserialize(data).map_err(|e| PersistError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    let actual = snapshot.store.len() as u64;
    if actual != snapshot.header.record_count {
        return Err(PersistError::RecordCount {
            expected: snapshot.header.record_count,
            actual,
        });
    }
    Ok((snapshot.header, snapshot.store))
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives finished datasets. Only frozen stores are ever handed over.
pub trait PersistenceSink {
    fn persist(&mut self, key: &str, store: &FrozenStore) -> Result<(), PersistError>;

    fn persist_messages(&mut self, _messages: &Messages) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Keeps persisted stores in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub stores: BTreeMap<String, FrozenStore>,
    pub messages: Option<Messages>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&mut self, key: &str, store: &FrozenStore) -> Result<(), PersistError> {
        self.stores.insert(key.to_string(), store.clone());
        Ok(())
    }

    fn persist_messages(&mut self, messages: &Messages) -> Result<(), PersistError> {
        self.messages = Some(messages.clone());
        Ok(())
    }
}

/// Encodes every persisted store with [`encode_store`].
#[derive(Debug, Default)]
pub struct BytesSink {
    pub blobs: BTreeMap<String, Vec<u8>>,
}

impl BytesSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceSink for BytesSink {
    fn persist(&mut self, key: &str, store: &FrozenStore) -> Result<(), PersistError> {
        let bytes = encode_store(key, store)?;
        self.blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    fn persist_messages(&mut self, messages: &Messages) -> Result<(), PersistError> {
        let bytes = bitcode::serialize(messages).map_err(|e| PersistError::Encode(e.to_string()))?;
        self.blobs.insert("messages".to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::store::DataStore;
    use crate::value::Value;

    fn make_store() -> FrozenStore {
        let mut store = DataStore::new("Ability");
        store
            .insert(Record::new("STENCH").with("real_name", Value::str("Stench")))
            .unwrap();
        store
            .insert(
                Record::new("DRIZZLE")
                    .with("real_name", Value::str("Drizzle"))
                    .with("flags", Value::List(vec![Value::str("Weather")])),
            )
            .unwrap();
        store.freeze()
    }

    #[test]
    fn encoded_store_decodes_with_index() {
        let store = make_store();
        let bytes = encode_store("abilities", &store).unwrap();
        let (header, decoded) = decode_store(&bytes).unwrap();
        assert_eq!(header.key, "abilities");
        assert_eq!(header.record_count, 2);
        assert_eq!(decoded, store);
        assert!(decoded.exists(&"DRIZZLE".into()));
        let order: Vec<_> = decoded.each().map(|r| r.id.to_string()).collect();
        assert_eq!(order, vec!["STENCH", "DRIZZLE"]);
    }

    #[test]
    fn header_version_checks() {
        let mut header = SnapshotHeader::new("x", 0);
        assert!(header.validate().is_ok());
        header.version = FORMAT_VERSION + 1;
        assert!(matches!(header.validate(), Err(PersistError::FutureVersion(_))));
        header.version = 0;
        assert!(matches!(header.validate(), Err(PersistError::UnsupportedVersion(0))));
        header.version = FORMAT_VERSION;
        header.magic = 0xDEAD_BEEF;
        let err = header.validate().unwrap_err();
        assert!(err.to_string().contains("0xDEADBEEF"), "got: {err}");
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(decode_store(&[1, 2, 3]), Err(PersistError::Decode(_))));
    }

    #[test]
    fn memory_sink_keeps_stores() {
        let mut sink = MemorySink::new();
        sink.persist("abilities", &make_store()).unwrap();
        sink.persist_messages(&Messages::new()).unwrap();
        assert_eq!(sink.stores["abilities"].len(), 2);
        assert!(sink.messages.is_some());
    }

    #[test]
    fn bytes_sink_encodes_stores() {
        let mut sink = BytesSink::new();
        sink.persist("abilities", &make_store()).unwrap();
        let (_, decoded) = decode_store(&sink.blobs["abilities"]).unwrap();
        assert_eq!(decoded.len(), 2);
    }
}
