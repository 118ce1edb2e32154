use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;
use log::{debug, warn};

use crate::pel_values::PHYP_CREATOR_ID;

type NameTable = HashMap<String, String>;

/// Resolves component IDs to display names.
///
/// Names come from optional `<creator>_component_ids.json` files, loaded lazily the first time a
/// creator is seen. A missing or unreadable file is remembered and not retried.
#[derive(Debug, Default)]
pub struct ComponentNames {
    base_dir: Option<PathBuf>,
    tables: RwLock<HashMap<char, Option<Arc<NameTable>>>>,
}

impl ComponentNames {
    /// Lookup without any name files; every component renders as its hex id.
    pub fn new() -> Self {
        ComponentNames::default()
    }

    pub fn from_dir(base_dir: impl AsRef<Path>) -> Self {
        ComponentNames {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Register a name table for `creator_id` directly, replacing any file based table.
    pub fn insert_table(&self, creator_id: char, table: impl IntoIterator<Item = (u16, String)>) {
        let table = table
            .into_iter()
            .map(|(id, name)| (format!("{:04X}", id), name))
            .collect();
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(creator_id, Some(Arc::new(table)));
    }

    /// Display name for a component ID.
    ///
    /// PHYP component IDs are two ASCII characters. Everything else is looked up in the creator's
    /// table, falling back to the four digit hex value.
    pub fn display_name(&self, component_id: u16, creator_id: char) -> String {
        let hex = format!("{:04X}", component_id);

        if creator_id == PHYP_CREATOR_ID {
            let [first, second] = component_id.to_be_bytes();
            if first != 0 && second != 0 {
                return format!("{}{}", first as char, second as char);
            }
            return hex;
        }

        match self.table_for(creator_id) {
            Some(table) => table.get(&hex).cloned().unwrap_or(hex),
            None => hex,
        }
    }

    fn table_for(&self, creator_id: char) -> Option<Arc<NameTable>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = tables.get(&creator_id) {
            return cached.clone();
        }
        drop(tables);

        let loaded = self.load_table(creator_id).map(Arc::new);
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(creator_id)
            .or_insert(loaded)
            .clone()
    }

    fn load_table(&self, creator_id: char) -> Option<NameTable> {
        let path = self
            .base_dir
            .as_ref()?
            .join(format!("{}_component_ids.json", creator_id));

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                debug!("No component names for creator `{}` at {}: {}", creator_id, path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<std::collections::HashMap<String, String>>(&text) {
            Ok(table) => {
                debug!("Loaded {} component names from {}", table.len(), path.display());
                Some(
                    table
                        .into_iter()
                        .map(|(k, v)| (k.to_ascii_uppercase(), v))
                        .collect(),
                )
            }
            Err(e) => {
                warn!("Ignoring malformed component name file {}: {}", path.display(), e);
                None
            }
        }
    }
}
