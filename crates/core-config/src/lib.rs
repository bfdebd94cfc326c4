//! Configuration loading and parsing.
//!
//! Parses `backedit.toml` (or an override path provided by the binary),
//! extracting the output suffix and the set of render file extensions. The
//! file naming conventions that tie a render to its baseline, trace, and
//! data files live here too, next to the settings that shape them. Unknown
//! fields are ignored (TOML deserialization tolerance) to allow forward
//! evolution without immediate warnings.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{ffi::OsStr, fs};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Suffix appended to a source path when writing its reconciled copy.
    #[serde(default = "OutputConfig::default_suffix")]
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: Self::default_suffix(),
        }
    }
}

impl OutputConfig {
    fn default_suffix() -> String {
        ".new".to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    /// Extensions (without the dot) recognized as edited renders. The first
    /// entry is also the extension forward mode renders to.
    #[serde(default = "RenderConfig::default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            extensions: Self::default_extensions(),
        }
    }
}

impl RenderConfig {
    fn default_extensions() -> Vec<String> {
        vec!["html".to_string(), "txt".to_string()]
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    // Prefer a local working directory `backedit.toml` before falling back
    // to the platform config dir.
    let local = PathBuf::from("backedit.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("backedit").join("backedit.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("backedit.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    raw: Some(content),
                    file,
                })
            }
            Err(_e) => {
                // On parse error fall back to defaults (breadth-first resilience).
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    pub fn output_suffix(&self) -> &str {
        &self.file.output.suffix
    }

    /// True when the path carries one of the recognized render extensions.
    pub fn is_render_path(&self, path: &Path) -> bool {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) => self.file.render.extensions.iter().any(|e| e == ext),
            None => false,
        }
    }

    pub fn is_template_path(&self, path: &Path) -> bool {
        path.extension().and_then(OsStr::to_str) == Some("tmpl")
    }

    /// Forward-mode render target: `page.tmpl` becomes `page.html`.
    pub fn render_path(&self, template: &Path) -> PathBuf {
        let ext = self
            .file
            .render
            .extensions
            .first()
            .map(String::as_str)
            .unwrap_or("html");
        template.with_extension(ext)
    }

    /// Baseline sibling of an edited render: `page.html` becomes
    /// `page.orig.html`.
    pub fn baseline_path(&self, render: &Path) -> PathBuf {
        match render.extension().and_then(OsStr::to_str) {
            Some(ext) => render.with_extension(format!("orig.{ext}")),
            None => render.with_extension("orig"),
        }
    }

    /// Trace sibling of a render: `page.html` becomes `page.trace.json`.
    pub fn trace_path(&self, render: &Path) -> PathBuf {
        render.with_extension("trace.json")
    }

    /// Data context sibling of a template: `page.tmpl` becomes
    /// `page.data.toml`.
    pub fn data_path(&self, template: &Path) -> PathBuf {
        template.with_extension("data.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.output_suffix(), ".new");
        assert_eq!(cfg.file.render.extensions, vec!["html", "txt"]);
    }

    #[test]
    fn parses_suffix_and_extensions() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[output]\nsuffix = \".out\"\n[render]\nextensions = [\"htm\"]\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.output_suffix(), ".out");
        assert!(cfg.is_render_path(Path::new("a.htm")));
        assert!(!cfg.is_render_path(Path::new("a.html")));
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[output\nsuffix = 3").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.output_suffix(), ".new");
    }

    #[test]
    fn derives_sibling_paths_from_naming_conventions() {
        let cfg = Config::default();
        assert_eq!(
            cfg.render_path(Path::new("dir/page.tmpl")),
            PathBuf::from("dir/page.html")
        );
        assert_eq!(
            cfg.baseline_path(Path::new("dir/page.html")),
            PathBuf::from("dir/page.orig.html")
        );
        assert_eq!(
            cfg.trace_path(Path::new("dir/page.html")),
            PathBuf::from("dir/page.trace.json")
        );
        assert_eq!(
            cfg.data_path(Path::new("dir/page.tmpl")),
            PathBuf::from("dir/page.data.toml")
        );
    }

    #[test]
    fn baseline_of_a_baseline_keeps_the_render_extension() {
        let cfg = Config::default();
        // `with_extension` replaces only the final extension component.
        assert_eq!(
            cfg.baseline_path(Path::new("page.orig.html")),
            PathBuf::from("page.orig.orig.html")
        );
    }

    #[test]
    fn template_detection_is_extension_based() {
        let cfg = Config::default();
        assert!(cfg.is_template_path(Path::new("page.tmpl")));
        assert!(!cfg.is_template_path(Path::new("page.html")));
        assert!(!cfg.is_template_path(Path::new("page")));
    }
}
