//! Preview configuration
//!
//! Owned by the host editor; the relay only reads the options below.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::types::ImageFormat;

pub const DEFAULT_START_URL: &str = "http://code.visualstudio.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    pub chrome_executable: Option<String>,
    pub start_url: Option<String>,
    pub format: ImageFormat,
    pub is_verbose_mode: bool,
    pub ignore_https_errors: bool,
    pub headless: bool,
    pub column_number: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            start_url: Some(DEFAULT_START_URL.to_string()),
            format: ImageFormat::Jpeg,
            is_verbose_mode: false,
            ignore_https_errors: false,
            headless: true,
            column_number: 1,
        }
    }
}

impl PreviewConfig {
    /// Apply the editor's settings object. Unknown keys and wrong types are ignored.
    pub fn merge_settings(&mut self, settings: &Value) {
        if let Some(path) = settings.get("chromeExecutable").and_then(Value::as_str) {
            self.chrome_executable = Some(path.to_string());
        }
        if let Some(url) = settings.get("startUrl").and_then(Value::as_str) {
            self.start_url = Some(url.to_string());
        }
        if let Some(verbose) = settings.get("verbose").and_then(Value::as_bool) {
            self.is_verbose_mode = verbose;
        }
        if let Some(ignore) = settings.get("ignoreHttpsErrors").and_then(Value::as_bool) {
            self.ignore_https_errors = ignore;
        }
        if let Some(format) = settings.get("format").and_then(Value::as_str) {
            self.format = if format.contains("png") {
                ImageFormat::Png
            } else {
                ImageFormat::Jpeg
            };
        }
    }
}

const KNOWN_SCHEMES: &[&str] = &["http", "https", "file", "about", "data", "chrome"];

/// Turn what a user typed into a navigable URL. Bare hosts get `http://`.
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    if let Ok(url) = Url::parse(input) {
        if KNOWN_SCHEMES.contains(&url.scheme()) {
            return url.to_string();
        }
    }
    match Url::parse(&format!("http://{}", input)) {
        Ok(url) => url.to_string(),
        Err(_) => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_settings() {
        let mut config = PreviewConfig::default();
        config.merge_settings(&json!({
            "chromeExecutable": "/usr/bin/chromium",
            "format": "image/png",
            "verbose": true,
            "unknown": 42
        }));

        assert_eq!(config.chrome_executable.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.format, ImageFormat::Png);
        assert!(config.is_verbose_mode);
        assert_eq!(config.start_url.as_deref(), Some(DEFAULT_START_URL));
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(PreviewConfig::default()).unwrap();
        assert_eq!(value["format"], "jpeg");
        assert_eq!(value["isVerboseMode"], false);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com/");
        assert_eq!(normalize_url("localhost:3000"), "http://localhost:3000/");
        assert_eq!(normalize_url("https://rust-lang.org"), "https://rust-lang.org/");
        assert_eq!(normalize_url("about:blank"), "about:blank");
    }
}
