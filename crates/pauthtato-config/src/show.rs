//! Source-annotated display for `pauthtato config`.

use std::fmt::Write as _;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded.
    pub loaded_files: Vec<String>,
}

/// Output format for `pauthtato config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption).
    Json,
}

impl ResolvedConfig {
    /// Render the resolved config. The API key is never included.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RenderError`] if serialization fails.
    pub fn show(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::RenderError(e.to_string())),
        }
    }

    fn show_toml(&self) -> ConfigResult<String> {
        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::RenderError(e.to_string()))?;

        let mut output = String::new();
        output.push_str("# Resolved Pauthtato Configuration\n");
        output.push_str("# Source annotations: [defaults] [file] [env]\n");
        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files:\n");
            for path in &self.loaded_files {
                let _ = writeln!(output, "#   {path}");
            }
        }
        output.push('\n');

        let mut section = String::new();
        for line in toml_str.lines() {
            let trimmed = line.trim();
            if let Some(header) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                header.clone_into(&mut section);
            }

            match self.annotate_line(trimmed, &section) {
                Some(annotation) => {
                    let _ = writeln!(output, "{line}  # {annotation}");
                },
                None => {
                    output.push_str(line);
                    output.push('\n');
                },
            }
        }

        Ok(output)
    }

    /// Source annotation for a `key = value` line inside `section`.
    fn annotate_line(&self, trimmed: &str, section: &str) -> Option<String> {
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let key = trimmed.split('=').next()?.trim();
        if key == "has_api_key" {
            return self
                .field_sources
                .get("auth.api_key")
                .map(|layer| format!("[{layer}] redacted"));
        }

        let path = if section.is_empty() {
            key.to_owned()
        } else {
            format!("{section}.{key}")
        };
        self.field_sources
            .get(&path)
            .map(|layer| format!("[{layer}]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ConfigLayer;

    fn resolved() -> ResolvedConfig {
        let mut config = Config::default();
        config.auth.api_key = Some("top-secret-key".to_owned());
        config.server.port = 8080;

        let mut field_sources = FieldSources::new();
        field_sources.insert("server.port".to_owned(), ConfigLayer::Environment);
        field_sources.insert("server.host".to_owned(), ConfigLayer::Defaults);
        field_sources.insert("auth.api_key".to_owned(), ConfigLayer::Environment);
        field_sources.insert("ledger.retry.max_attempts".to_owned(), ConfigLayer::File);

        ResolvedConfig {
            config,
            field_sources,
            loaded_files: vec!["./pauthtato.toml".to_owned()],
        }
    }

    #[test]
    fn test_show_toml_annotates_sources() {
        let output = resolved().show(ShowFormat::Toml).unwrap();
        assert!(output.contains("Resolved Pauthtato Configuration"));
        assert!(output.contains("./pauthtato.toml"));
        assert!(output.contains("port = 8080  # [env]"));
        assert!(output.contains("host = \"0.0.0.0\"  # [defaults]"));
        assert!(output.contains("max_attempts = 5  # [file]"));
    }

    #[test]
    fn test_show_never_leaks_api_key() {
        let r = resolved();
        for format in [ShowFormat::Toml, ShowFormat::Json] {
            let output = r.show(format).unwrap();
            assert!(!output.contains("top-secret-key"));
        }
        assert!(r.show(ShowFormat::Toml).unwrap().contains("redacted"));
    }

    #[test]
    fn test_show_json_is_valid() {
        let output = resolved().show(ShowFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["server"]["port"], 8080);
        assert_eq!(value["auth"]["has_api_key"], true);
    }
}
