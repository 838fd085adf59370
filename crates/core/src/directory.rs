/// Directory payload
///
/// The JSON object served on the directory port, mapping each served
/// file's base name to its virtual port, e.g. `{"photo.jpg":1}`.
/// Built once and shared read-only by every directory connection.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tcpsite_common::{Target, VirtualPort};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct DirectoryPayload {
    entries: BTreeMap<String, VirtualPort>,
    bytes: Arc<[u8]>,
}

impl DirectoryPayload {
    /// Build the listing. The directory target itself is never listed.
    ///
    /// When two files share a name the first one keeps the entry.
    pub fn from_targets<'a, I>(targets: I) -> Result<Self, serde_json::Error>
    where
        I: IntoIterator<Item = &'a Target>,
    {
        let mut entries = BTreeMap::new();
        for target in targets {
            let Some(name) = target.listing_name() else {
                continue;
            };
            match entries.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(target.virtual_port());
                }
                Entry::Occupied(slot) => {
                    warn!("Not listing {}: {} is already listed", target, slot.key());
                }
            }
        }

        let bytes = serde_json::to_vec(&entries)?;

        Ok(Self {
            entries,
            bytes: bytes.into(),
        })
    }

    pub fn entries(&self) -> &BTreeMap<String, VirtualPort> {
        &self.entries
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap handle on the serialized bytes for connection handlers.
    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}
