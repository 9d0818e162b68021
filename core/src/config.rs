//! Client configuration.
//!
//! # Design
//! `Config` is plain data with public fields and `with_*` setters. The
//! environment is only read by `Config::from_env`; `Config::from_lookup`
//! takes any key lookup so tests never touch process-wide variables.
//!
//! | Variable           | Field          |
//! |--------------------|----------------|
//! | `OZMAP_URL`        | `base_url`     |
//! | `DRY_RUN`          | `dry_run`      |
//! | `FILTER_MODE`      | `filter_mode`  |
//! | `ID_MAP_PATH`      | `id_map_path`  |
//! | `OZMAP_LOCALE`     | `locale`       |
//! | `OZMAP_PAGINATION` | `pagination`   |

use std::path::PathBuf;

use crate::error::Result;
use crate::filter::FilterMode;
use crate::http::TimeoutBudget;
use crate::i18n::Locale;
use crate::pagination::PaginationStrategy;

/// Default cap on page requests for one fetch-all.
pub const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Default location of the id-map cache file.
pub const DEFAULT_ID_MAP_PATH: &str = "id_map.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    /// Log mutating calls without sending them.
    pub dry_run: bool,
    pub filter_mode: FilterMode,
    pub id_map_path: PathBuf,
    pub locale: Locale,
    pub pagination: PaginationStrategy,
    /// `None` disables the fetch-all page cap.
    pub max_pages: Option<u32>,
    pub timeout: TimeoutBudget,
    pub export_timeout: TimeoutBudget,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            dry_run: false,
            filter_mode: FilterMode::Body,
            id_map_path: PathBuf::from(DEFAULT_ID_MAP_PATH),
            locale: Locale::PtBr,
            pagination: PaginationStrategy::Cursor,
            max_pages: Some(DEFAULT_MAX_PAGES),
            timeout: TimeoutBudget::STANDARD,
            export_timeout: TimeoutBudget::EXPORT,
        }
    }
}

impl Config {
    /// Read the recognized variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// `DRY_RUN` is on only for the literal `"true"` and `FILTER_MODE`
    /// switches to URL encoding only for `"URL"`; other values keep the
    /// defaults. Unknown locales or pagination strategies are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        config.base_url = lookup("OZMAP_URL").filter(|url| !url.trim().is_empty());
        config.dry_run = lookup("DRY_RUN").as_deref() == Some("true");
        if lookup("FILTER_MODE").as_deref() == Some("URL") {
            config.filter_mode = FilterMode::Url;
        }
        if let Some(path) = lookup("ID_MAP_PATH") {
            config.id_map_path = PathBuf::from(path);
        }
        if let Some(locale) = lookup("OZMAP_LOCALE") {
            config.locale = locale.parse()?;
        }
        if let Some(strategy) = lookup("OZMAP_PAGINATION") {
            config.pagination = strategy.parse()?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_id_map_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.id_map_path = path.into();
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination = strategy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutBudget) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_export_timeout(mut self, timeout: TimeoutBudget) -> Self {
        self.export_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_pages, Some(DEFAULT_MAX_PAGES));
        assert_eq!(config.id_map_path, PathBuf::from("id_map.json"));
    }

    #[test]
    fn recognized_variables_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("OZMAP_URL", "https://demo.ozmap.com.br"),
            ("DRY_RUN", "true"),
            ("FILTER_MODE", "URL"),
            ("ID_MAP_PATH", "/tmp/ids.json"),
            ("OZMAP_LOCALE", "en_US"),
            ("OZMAP_PAGINATION", "page"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://demo.ozmap.com.br"));
        assert!(config.dry_run);
        assert_eq!(config.filter_mode, FilterMode::Url);
        assert_eq!(config.id_map_path, PathBuf::from("/tmp/ids.json"));
        assert_eq!(config.locale, Locale::EnUs);
        assert_eq!(config.pagination, PaginationStrategy::PageIncrement);
    }

    #[test]
    fn only_literal_values_toggle_flags() {
        let config = Config::from_lookup(lookup(&[("DRY_RUN", "1"), ("FILTER_MODE", "url")])).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.filter_mode, FilterMode::Body);
    }

    #[test]
    fn blank_url_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("OZMAP_URL", "  ")])).unwrap();
        assert!(config.base_url.is_none());
    }

    #[test]
    fn invalid_locale_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("OZMAP_LOCALE", "xx")])).is_err());
    }
}
