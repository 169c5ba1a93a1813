// ABOUTME: Sidecar detail document stored next to each screenshot as `<name>.<ext>.json`.
// ABOUTME: Holds the user's annotations plus generated content and code blocks.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One fenced code block extracted from a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default = "CodeBlock::default_language")]
    pub language: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl CodeBlock {
    fn default_language() -> String {
        "text".to_string()
    }
}

impl Default for CodeBlock {
    fn default() -> Self {
        Self {
            language: Self::default_language(),
            code: None,
        }
    }
}

/// Per-image annotation document. Unknown fields in stored files are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Detail {
    pub project: Option<String>,
    pub location: Option<String>,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub tool: Option<String>,
    pub content: Option<String>,
    pub code: Vec<CodeBlock>,
    pub code_no_desc: Vec<CodeBlock>,
}

impl Detail {
    /// Sidecar path for an image: the full file name with ".json" appended
    /// (`charts.png` -> `charts.png.json`).
    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = image
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".json");
        image.with_file_name(name)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::from)
    }

    /// Load the sidecar, falling back to an empty document when the file is
    /// absent or corrupt. Batches must not fail on a bad sidecar.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(detail) => detail,
            Err(err) => {
                log::warn!(
                    "[Detail] Using empty detail for {}: {}",
                    path.display(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        std::fs::write(path, text)
    }

    /// Metadata lines appended to code-generation prompts. Empty fields are
    /// skipped entirely.
    pub fn context_text(&self) -> String {
        let mut text = String::new();
        let fields = [
            ("Project", &self.project),
            ("File Location", &self.location),
            ("Using Framework", &self.framework),
            ("Code Language", &self.language),
            ("Test Tool", &self.tool),
            ("Image Content", &self.content),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                if !value.is_empty() {
                    text.push_str(&format!("\n{}: {}", label, value));
                }
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_appends_json_to_full_name() {
        let path = Detail::sidecar_path(Path::new("/shots/charts.png"));
        assert_eq!(path, PathBuf::from("/shots/charts.png.json"));
    }

    #[test]
    fn load_missing_file_errors_but_or_default_does_not() {
        let missing = Path::new("/definitely/not/here.png.json");
        assert!(Detail::load(missing).is_err());
        let detail = Detail::load_or_default(missing);
        assert!(detail.project.is_none());
        assert!(detail.code.is_empty());
    }

    #[test]
    fn corrupt_sidecar_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png.json");
        std::fs::write(&path, "{ not json").unwrap();
        let detail = Detail::load_or_default(&path);
        assert!(detail.content.is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png.json");
        let detail = Detail {
            project: Some("/home/me/app".to_string()),
            location: Some("src/views/Login.vue".to_string()),
            content: Some("A login page".to_string()),
            code: vec![CodeBlock {
                language: "javascript".to_string(),
                code: Some("expect(1).toBe(1)".to_string()),
            }],
            ..Default::default()
        };
        detail.save(&path).unwrap();

        let loaded = Detail::load(&path).unwrap();
        assert_eq!(loaded.project.as_deref(), Some("/home/me/app"));
        assert_eq!(loaded.code.len(), 1);
        assert_eq!(loaded.code[0].language, "javascript");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"project": "p", "someday": "maybe", "code": []}"#;
        let detail: Detail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.project.as_deref(), Some("p"));
    }

    #[test]
    fn context_text_skips_empty_fields() {
        let detail = Detail {
            project: Some("my-app".to_string()),
            framework: Some(String::new()),
            language: Some("typescript".to_string()),
            ..Default::default()
        };
        let text = detail.context_text();
        assert_eq!(text, "\nProject: my-app\nCode Language: typescript");
    }
}
