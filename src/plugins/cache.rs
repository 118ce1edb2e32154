use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;
use log::{debug, warn};
use serde_json::{Map, Value};

use super::{PluginRegistry, PluginSource, SrcParser, UserDataParser};
use crate::err::{PluginError, PluginResult};

type Slot<T> = Option<Arc<T>>;

/// Read-through cache of plugin load results.
///
/// Each key is loaded at most once in the common case; a failed load is cached as `None` and
/// never retried. Only *load* outcomes are cached, a plugin that fails to decode one payload is
/// still invoked for the next one.
pub struct PluginCache {
    source: Arc<dyn PluginSource>,
    user_data: RwLock<HashMap<String, Slot<dyn UserDataParser>>>,
    src: RwLock<HashMap<String, Slot<dyn SrcParser>>>,
    load_attempts: AtomicUsize,
}

impl std::fmt::Debug for PluginCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCache")
            .field("load_attempts", &self.load_attempts())
            .finish()
    }
}

impl Default for PluginCache {
    fn default() -> Self {
        PluginCache::new(Arc::new(PluginRegistry::new()))
    }
}

fn resolve<T: ?Sized>(
    slots: &RwLock<HashMap<String, Slot<T>>>,
    name: &str,
    attempts: &AtomicUsize,
    load: impl FnOnce() -> PluginResult<Arc<T>>,
) -> Slot<T> {
    if let Some(slot) = slots.read().unwrap_or_else(PoisonError::into_inner).get(name) {
        return slot.clone();
    }

    // Loaded outside of the lock. Another thread may race us to the same key, in which case the
    // first stored result wins and ours is dropped.
    attempts.fetch_add(1, Ordering::Relaxed);
    let loaded = match load() {
        Ok(plugin) => {
            debug!("Loaded plugin `{}`", name);
            Some(plugin)
        }
        Err(PluginError::NotFound { .. }) => {
            debug!("No plugin `{}`, caching the miss", name);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    };

    slots
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(name.to_string())
        .or_insert(loaded)
        .clone()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "plugin panicked".to_string()
    }
}

/// Run a plugin call, turning a panic into a decode failure for this payload.
fn call_plugin<T>(name: &str, call: impl FnOnce() -> PluginResult<T>) -> PluginResult<T> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(PluginError::Decode {
            name: name.to_string(),
            message: format!("panicked: {}", panic_message(payload.as_ref())),
        })
    })
}

impl PluginCache {
    pub fn new(source: Arc<dyn PluginSource>) -> Self {
        PluginCache {
            source,
            user_data: RwLock::new(HashMap::new()),
            src: RwLock::new(HashMap::new()),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// Number of times the underlying source was asked to load a plugin.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Relaxed)
    }

    pub fn user_data_parser(&self, name: &str) -> Option<Arc<dyn UserDataParser>> {
        resolve(&self.user_data, name, &self.load_attempts, || {
            self.source.load_user_data_parser(name)
        })
    }

    pub fn src_parser(&self, name: &str) -> Option<Arc<dyn SrcParser>> {
        resolve(&self.src, name, &self.load_attempts, || {
            self.source.load_src_parser(name)
        })
    }

    /// Decode a user data payload with the plugin registered under `name`.
    ///
    /// Returns `None` if there is no such plugin or it failed on this payload.
    pub fn decode_user_data(
        &self,
        name: &str,
        sub_type: u8,
        version: u8,
        data: &[u8],
    ) -> Option<Value> {
        let parser = self.user_data_parser(name)?;
        let decoded = call_plugin(name, || parser.parse(sub_type, version, data))
            .and_then(|text| {
                serde_json::from_str::<Value>(&text).map_err(|source| PluginError::InvalidJson {
                    name: name.to_string(),
                    source,
                })
            });

        match decoded {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("User data plugin `{}` failed: {}", name, e);
                None
            }
        }
    }

    /// Run the SRC plugin registered under `name`, returning the fields it adds.
    pub fn decode_src(
        &self,
        name: &str,
        reference_code: &str,
        words: &[String; 8],
    ) -> Option<Map<String, Value>> {
        let parser = self.src_parser(name)?;
        let decoded =
            call_plugin(name, || parser.parse(reference_code, words)).and_then(|text| match text {
                None => Ok(Value::Null),
                Some(text) => serde_json::from_str::<Value>(&text).map_err(|source| {
                    PluginError::InvalidJson {
                        name: name.to_string(),
                        source,
                    }
                }),
            });

        match decoded {
            Ok(Value::Object(fields)) => Some(fields),
            Ok(Value::Null) => None,
            Ok(other) => {
                warn!(
                    "SRC plugin `{}` returned a non-object value, ignoring it: {}",
                    name, other
                );
                None
            }
            Err(e) => {
                warn!("SRC plugin `{}` failed: {}", name, e);
                None
            }
        }
    }
}
