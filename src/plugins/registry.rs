use std::sync::Arc;

use hashbrown::HashMap;

use super::{PluginSource, SrcParser, UserDataParser};
use crate::err::{PluginError, PluginResult};

/// A [`PluginSource`] backed by plugins linked into the program.
///
/// Plugins are registered under the same keys the decoder derives from a section, see
/// [`super::user_data_plugin_name`] and [`super::src_plugin_name`].
#[derive(Default, Clone)]
pub struct PluginRegistry {
    user_data: HashMap<String, Arc<dyn UserDataParser>>,
    src: HashMap<String, Arc<dyn SrcParser>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    pub fn with_user_data_parser(
        mut self,
        name: impl Into<String>,
        parser: impl UserDataParser + 'static,
    ) -> Self {
        self.user_data.insert(name.into(), Arc::new(parser));
        self
    }

    pub fn with_src_parser(mut self, name: impl Into<String>, parser: impl SrcParser + 'static) -> Self {
        self.src.insert(name.into(), Arc::new(parser));
        self
    }

    pub fn len(&self) -> usize {
        self.user_data.len() + self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PluginSource for PluginRegistry {
    fn load_user_data_parser(&self, name: &str) -> PluginResult<Arc<dyn UserDataParser>> {
        self.user_data
            .get(name)
            .cloned()
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
            })
    }

    fn load_src_parser(&self, name: &str) -> PluginResult<Arc<dyn SrcParser>> {
        self.src.get(name).cloned().ok_or_else(|| PluginError::NotFound {
            name: name.to_string(),
        })
    }
}
