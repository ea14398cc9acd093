//! Read-only template lookup.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::Template;
use crate::embedded_templates;
use crate::error::{CatalogueError, JudgeError};

/// Resolves template identifiers. Implementations are shared read-only
/// across concurrent evaluations.
pub trait TemplateStore {
    fn get_template(&self, template_id: &str) -> Result<&Template, JudgeError>;

    /// All templates, ordered by identifier.
    fn templates(&self) -> Vec<&Template>;
}

/// On-disk catalogue layout: `templates: { <id>: <template> }`.
#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    templates: BTreeMap<String, Template>,
}

/// In-memory template catalogue keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    templates: BTreeMap<String, Template>,
}

impl Catalogue {
    /// Parse a catalogue from YAML (or JSON) text. `origin` names the source
    /// in error messages.
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile =
            serde_norway::from_str(content).map_err(|source| CatalogueError::Parse {
                origin: origin.to_string(),
                source,
            })?;

        let mut templates = BTreeMap::new();
        for (key, mut template) in file.templates {
            if template.template_id.is_empty() {
                template.template_id = key.clone();
            } else if template.template_id != key {
                return Err(CatalogueError::Invalid {
                    origin: origin.to_string(),
                    source: JudgeError::invalid_template(
                        &key,
                        format!("template_id '{}' does not match its key", template.template_id),
                    ),
                });
            }
            template.validate().map_err(|source| CatalogueError::Invalid {
                origin: origin.to_string(),
                source,
            })?;
            templates.insert(key, template);
        }
        Ok(Self { templates })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// The seed catalogue compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogueError> {
        Self::from_yaml_str(embedded_templates::DEFAULT_TEMPLATES, "(embedded)")
    }

    /// Add a template, generating an identifier when it has none.
    /// Returns the identifier it was stored under.
    pub fn insert(&mut self, mut template: Template) -> Result<String, JudgeError> {
        if template.template_id.is_empty() {
            template.template_id = uuid::Uuid::new_v4().to_string();
        }
        template.validate()?;
        let id = template.template_id.clone();
        self.templates.insert(id.clone(), template);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStore for Catalogue {
    fn get_template(&self, template_id: &str) -> Result<&Template, JudgeError> {
        self.templates
            .get(template_id)
            .ok_or_else(|| JudgeError::TemplateNotFound(template_id.to_string()))
    }

    fn templates(&self) -> Vec<&Template> {
        self.templates.values().collect()
    }
}
