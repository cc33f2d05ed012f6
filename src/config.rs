//! Kernel configuration.
//!
//! Every constant the wire protocol depends on lives here so it can be
//! checked against the real runtime instead of being baked into handlers.

use std::collections::BTreeMap;

/// Number of wrapping characters stripped from each raw-rendered stream.
///
/// A stream renders as `b'...'`, so two characters lead and one trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFraming {
    pub leading: usize,
    pub trailing: usize,
}

impl Default for OutputFraming {
    fn default() -> Self {
        Self {
            leading: 2,
            trailing: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Runtime executable used both for the REPL and for one-shot scripts.
    pub runtime: String,
    /// Script handed to the runtime to start the persistent REPL.
    pub repl_script: String,
    /// When false, no REPL process is spawned and the session starts dead.
    pub start_repl: bool,
    /// Greeting lines the REPL prints before it accepts requests.
    pub greeting_lines: usize,
    /// Request sent to the REPL to list loaded symbols.
    pub inspect_request: String,
    /// Line that ends an inspect reply.
    pub inspect_terminator: String,
    pub framing: OutputFraming,
    /// Directive tag (lower case) to temp-file extension.
    pub languages: BTreeMap<String, String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        let languages = [("python", ".py"), ("javascript", ".js")]
            .into_iter()
            .map(|(tag, ext)| (tag.to_string(), ext.to_string()))
            .collect();
        Self {
            runtime: "metacall".to_string(),
            repl_script: "repl.js".to_string(),
            start_repl: true,
            greeting_lines: 1,
            inspect_request: "%inspect".to_string(),
            inspect_terminator: "\n".to_string(),
            framing: OutputFraming::default(),
            languages,
        }
    }
}

impl KernelConfig {
    /// Extension registered for `tag`, matched case-insensitively.
    pub fn extension_for(&self, tag: &str) -> Option<&str> {
        self.languages
            .get(&tag.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Register a language from a `tag=.ext` entry.
    ///
    /// A missing leading dot is added.
    pub fn add_language(&mut self, entry: &str) -> Option<()> {
        let (tag, ext) = entry.split_once('=')?;
        let (tag, ext) = (tag.trim().to_lowercase(), ext.trim());
        if tag.is_empty() || ext.is_empty() {
            return None;
        }
        let ext = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        self.languages.insert(tag, ext);
        Some(())
    }

    pub fn language_names(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_languages() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.extension_for("python"), Some(".py"));
        assert_eq!(cfg.extension_for("JavaScript"), Some(".js"));
        assert_eq!(cfg.extension_for("cobol"), None);
    }

    #[test]
    fn test_add_language() {
        let mut cfg = KernelConfig::default();
        assert!(cfg.add_language("Ruby=rb").is_some());
        assert!(cfg.add_language("typescript=.ts").is_some());
        assert!(cfg.add_language("broken").is_none());
        assert!(cfg.add_language("=.x").is_none());

        assert_eq!(cfg.extension_for("ruby"), Some(".rb"));
        assert_eq!(cfg.extension_for("typescript"), Some(".ts"));
        assert_eq!(
            cfg.language_names(),
            vec!["javascript", "python", "ruby", "typescript"]
        );
    }
}
