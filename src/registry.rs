//! Plugin registry: format key -> plugin factory.
//!
//! The registry maps a normalized format key (a leading-dot, lowercase
//! file extension like `.flv`) to a factory that produces a fresh plugin
//! instance per task. Registering the same key twice overwrites the
//! factory, but the key appears at most once in the supported-format
//! listing.

use std::collections::HashMap;
use std::path::Path;

use crate::plugin::PluginFactory;

/// Normalizes a format key to its canonical leading-dot, lowercase form.
///
/// Both `"flv"` and `".FLV"` normalize to `".flv"`.
pub fn normalize_format(key: &str) -> String {
    let key = key.trim().to_ascii_lowercase();
    if key.starts_with('.') {
        key
    } else {
        format!(".{key}")
    }
}

/// Extracts the normalized format suffix of a path, if it has one.
///
/// Returns `None` when the path carries no extension, which callers treat
/// as an invalid input/output path.
pub fn format_suffix(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(normalize_format)
}

/// Registry of supported transcode formats and their plugin factories.
pub struct PluginRegistry {
    /// Factories keyed by normalized format.
    factories: HashMap<String, PluginFactory>,
    /// Supported formats in registration order, duplicates suppressed.
    formats: Vec<String>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            formats: Vec::new(),
        }
    }

    /// Registers a plugin factory for a format.
    ///
    /// Registering an already-known format overwrites its factory;
    /// the format listing is unaffected (idempotent).
    pub fn register(&mut self, format: &str, factory: PluginFactory) {
        let key = normalize_format(format);
        if self.factories.insert(key.clone(), factory).is_none() {
            self.formats.push(key);
        }
    }

    /// Returns the supported formats in registration order.
    pub fn formats(&self) -> Vec<String> {
        self.formats.clone()
    }

    /// Resolves the factory registered for a format key.
    pub fn resolve(&self, format: &str) -> Option<PluginFactory> {
        self.factories.get(&normalize_format(format)).cloned()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("formats", &self.formats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::plugin::{ExecArgs, PluginError, TransMessage, TransPlugin};

    struct NullPlugin;

    #[async_trait::async_trait]
    impl TransPlugin for NullPlugin {
        fn kind(&self) -> &str {
            "null"
        }

        async fn execute(
            &self,
            _input: &str,
            _output: &str,
            _args: &ExecArgs,
        ) -> Result<TransMessage, PluginError> {
            Ok(TransMessage::default())
        }

        async fn cancel(&self) -> Result<(), PluginError> {
            Ok(())
        }

        async fn progress(
            &self,
        ) -> Result<std::collections::HashMap<String, serde_json::Value>, PluginError> {
            Ok(Default::default())
        }
    }

    fn null_factory() -> PluginFactory {
        Arc::new(|| Arc::new(NullPlugin))
    }

    #[test]
    fn test_normalize_format() {
        assert_eq!(normalize_format("flv"), ".flv");
        assert_eq!(normalize_format(".flv"), ".flv");
        assert_eq!(normalize_format(".FLV"), ".flv");
        assert_eq!(normalize_format(" avi "), ".avi");
    }

    #[test]
    fn test_format_suffix() {
        assert_eq!(format_suffix("clip.flv"), Some(".flv".to_string()));
        assert_eq!(format_suffix("/videos/a.b/clip.MP4"), Some(".mp4".to_string()));
        assert_eq!(format_suffix("clip"), None);
        assert_eq!(format_suffix(""), None);
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = PluginRegistry::new();
        registry.register(".flv", null_factory());

        assert!(registry.resolve(".flv").is_some());
        // Keys are normalized on both sides.
        assert!(registry.resolve("FLV").is_some());
        assert!(registry.resolve(".avi").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_idempotent() {
        let mut registry = PluginRegistry::new();
        registry.register(".flv", null_factory());
        registry.register("flv", null_factory());
        registry.register(".avi", null_factory());

        assert_eq!(registry.formats(), vec![".flv", ".avi"]);
    }

    #[test]
    fn test_formats_preserve_registration_order() {
        let mut registry = PluginRegistry::new();
        registry.register(".mkv", null_factory());
        registry.register(".flv", null_factory());
        registry.register(".avi", null_factory());

        assert_eq!(registry.formats(), vec![".mkv", ".flv", ".avi"]);
    }

    #[test]
    fn test_factory_produces_fresh_instances() {
        let mut registry = PluginRegistry::new();
        registry.register(".flv", null_factory());

        let factory = registry.resolve(".flv").expect("factory");
        let a = factory();
        let b = factory();

        assert!(!Arc::ptr_eq(&a, &b));
    }
}
