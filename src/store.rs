//! Local library state: projects, categories, tags and the current selection,
//! kept as plain JSON files under one data directory.
//!
//! ```text
//! <data_dir>/projects.json              {"projects": [...]}
//! <data_dir>/projects/<id>.json         one project's settings
//! <data_dir>/projectData/<id>/<section>.json
//! <data_dir>/active-project.json        {"activeProjectId": ...}
//! <data_dir>/categories.json, tags.json, selected-category.json, selected-tags.json
//! ```

use crate::util::{ensure_dir, expand_tilde, now_rfc3339};
use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const UNCATEGORIZED: &str = "uncategorized";
pub const ALL_CATEGORIES: &str = "all";
pub const INITIAL_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub version_history: Vec<VersionEntry>,
    #[serde(default)]
    pub is_archived: bool,
    /// Fields this crate does not interpret are carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut p = Self {
            id: id.into(),
            name: Some(name.into()),
            ..Self::default()
        };
        p.fill_defaults();
        p
    }

    /// Fills timestamps, version and history that older files lack.
    pub fn fill_defaults(&mut self) {
        let now = now_rfc3339();
        let created = self.created.get_or_insert_with(|| now.clone()).clone();
        self.last_modified.get_or_insert_with(|| now.clone());
        self.last_accessed.get_or_insert_with(|| now.clone());
        self.version.get_or_insert_with(|| INITIAL_VERSION.to_string());
        if self.version_history.is_empty() {
            self.version_history.push(VersionEntry {
                version: INITIAL_VERSION.to_string(),
                date: created,
                description: "initial version".to_string(),
            });
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectsIndex {
    #[serde(default)]
    projects: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveProject {
    active_project_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionData {
    data: Value,
    last_modified: String,
}

pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn from_config(cfg: &crate::config::Store) -> Result<Self> {
        Self::open(expand_tilde(cfg.data_dir.trim()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    fn project_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.projects_dir().join(format!("{}.json", checked_name("project id", id)?)))
    }

    pub fn save_project(&self, project: &Project) -> Result<()> {
        let path = self.project_path(&project.id)?;
        ensure_dir(&self.projects_dir())?;
        write_json(&path, project)?;
        debug!("saved project {}", project.id);
        Ok(())
    }

    pub fn load_project(&self, id: &str) -> Result<Option<Project>> {
        let path = self.project_path(id)?;
        let Some(mut project) = read_json::<Project>(&path)? else {
            return Ok(None);
        };
        project.fill_defaults();
        Ok(Some(project))
    }

    /// Removes the project file and its `projects.json` entry. Returns false
    /// when no such project file existed.
    pub fn delete_project(&self, id: &str) -> Result<bool> {
        let path = self.project_path(id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;

        let index_path = self.index_path();
        if let Some(mut index) = read_json::<ProjectsIndex>(&index_path)? {
            let before = index.projects.len();
            index
                .projects
                .retain(|p| p.get("id").and_then(Value::as_str) != Some(id));
            if index.projects.len() != before {
                write_json(&index_path, &index)?;
            }
        }
        Ok(true)
    }

    /// Merges `projects.json` with the per-project files and rewrites the
    /// index. A per-project file replaces the index entry with the same id;
    /// index order is kept and new ids follow in file-name order.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut merged: Vec<Project> = Vec::new();

        let index = read_json::<ProjectsIndex>(&self.index_path()).unwrap_or_else(|e| {
            warn!("ignoring unreadable projects.json: {e:#}");
            None
        });
        for entry in index.map(|i| i.projects).unwrap_or_default() {
            match serde_json::from_value::<Project>(entry) {
                Ok(p) if !p.id.is_empty() => upsert(&mut merged, p),
                Ok(_) => {}
                Err(e) => warn!("skipping malformed projects.json entry: {e}"),
            }
        }

        let dir = self.projects_dir();
        ensure_dir(&dir)?;
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("read_dir {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|x| x == "json"))
            .collect();
        files.sort();
        for path in files {
            match read_json::<Project>(&path) {
                Ok(Some(p)) if !p.id.is_empty() => upsert(&mut merged, p),
                Ok(_) => {}
                Err(e) => warn!("skipping project file: {e:#}"),
            }
        }

        for p in &mut merged {
            p.fill_defaults();
        }
        let values = merged
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()
            .with_context(|| "serializing projects")?;
        write_json(&self.index_path(), &ProjectsIndex { projects: values })?;
        Ok(merged)
    }

    pub fn set_active_project(&self, id: Option<&str>) -> Result<()> {
        write_json(
            &self.root.join("active-project.json"),
            &ActiveProject {
                active_project_id: id.map(str::to_string),
            },
        )
    }

    pub fn active_project(&self) -> Option<String> {
        lenient::<ActiveProject>(&self.root.join("active-project.json"))
            .and_then(|a| a.active_project_id)
    }

    /// Always non-empty and always contains [`UNCATEGORIZED`]. A missing,
    /// empty or unreadable file is repaired on disk.
    pub fn categories(&self) -> Result<Vec<String>> {
        let path = self.root.join("categories.json");
        let stored = lenient::<Vec<String>>(&path).unwrap_or_default();
        let fixed = with_uncategorized(stored.clone());
        if fixed != stored {
            write_json(&path, &fixed)?;
        }
        Ok(fixed)
    }

    pub fn save_categories(&self, categories: &[String]) -> Result<()> {
        write_json(
            &self.root.join("categories.json"),
            &with_uncategorized(categories.to_vec()),
        )
    }

    pub fn tags(&self) -> Vec<String> {
        lenient(&self.root.join("tags.json")).unwrap_or_default()
    }

    pub fn save_tags(&self, tags: &[String]) -> Result<()> {
        write_json(&self.root.join("tags.json"), &tags)
    }

    /// Defaults to [`ALL_CATEGORIES`].
    pub fn selected_category(&self) -> String {
        lenient::<Option<String>>(&self.root.join("selected-category.json"))
            .flatten()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| ALL_CATEGORIES.to_string())
    }

    pub fn save_selected_category(&self, category: &str) -> Result<()> {
        write_json(&self.root.join("selected-category.json"), &category)
    }

    pub fn selected_tags(&self) -> Vec<String> {
        lenient(&self.root.join("selected-tags.json")).unwrap_or_default()
    }

    pub fn save_selected_tags(&self, tags: &[String]) -> Result<()> {
        write_json(&self.root.join("selected-tags.json"), &tags)
    }

    fn section_path(&self, project_id: &str, section: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join("projectData")
            .join(checked_name("project id", project_id)?)
            .join(format!("{}.json", checked_name("section", section)?)))
    }

    /// Stores `data` wrapped as `{"data": .., "lastModified": ..}`.
    pub fn save_project_data(&self, project_id: &str, section: &str, data: &Value) -> Result<()> {
        let path = self.section_path(project_id, section)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        write_json(
            &path,
            &SectionData {
                data: data.clone(),
                last_modified: now_rfc3339(),
            },
        )
    }

    pub fn load_project_data(&self, project_id: &str, section: &str) -> Result<Option<Value>> {
        let path = self.section_path(project_id, section)?;
        Ok(read_json::<SectionData>(&path)?.map(|s| s.data))
    }
}

fn upsert(projects: &mut Vec<Project>, project: Project) {
    match projects.iter_mut().find(|p| p.id == project.id) {
        Some(slot) => *slot = project,
        None => projects.push(project),
    }
}

fn with_uncategorized(mut categories: Vec<String>) -> Vec<String> {
    if !categories.iter().any(|c| c == UNCATEGORIZED) {
        categories.insert(0, UNCATEGORIZED.to_string());
    }
    categories
}

/// Ids and section names become path components; anything that could climb
/// out of the data directory is rejected.
fn checked_name<'a>(what: &str, name: &'a str) -> Result<&'a str> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(anyhow!("invalid {what}: {name:?}"));
    }
    Ok(name)
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .with_context(|| format!("parsing {}", path.display()))
}

/// Missing and unreadable files both read as `None`.
fn lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    read_json(path).unwrap_or_else(|e| {
        warn!("{e:#}");
        None
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("bad store path: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{name}.tmp"));
    std::fs::write(&tmp, raw).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_that_escape_the_data_dir_are_rejected() {
        for bad in ["", ".", "..", "a/b", "..\\x"] {
            assert!(checked_name("section", bad).is_err(), "{bad:?}");
        }
        assert_eq!(checked_name("section", "colors").unwrap(), "colors");
    }

    #[test]
    fn uncategorized_is_prepended_once() {
        assert_eq!(with_uncategorized(vec![]), vec![UNCATEGORIZED]);
        assert_eq!(
            with_uncategorized(vec!["agency".into()]),
            vec![UNCATEGORIZED, "agency"]
        );
        assert_eq!(
            with_uncategorized(vec!["agency".into(), UNCATEGORIZED.into()]),
            vec!["agency", UNCATEGORIZED]
        );
    }
}
