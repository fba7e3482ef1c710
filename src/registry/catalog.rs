//! Declarative model catalog
//!
//! The host describes each entity type's relations once, at setup:
//! - parent links (type-extends-type, one field per direct parent)
//! - link fields (single-valued references to another type)
//! - generic relations (reverse side of tag + id attachments)
//!
//! The registry resolves follow fields against this catalog instead of
//! introspecting a data-modeling framework at runtime.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{RegistryError, RegistryResult};
use crate::observability::{log_event, Event};

/// Link from a type to one of its direct parent types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Parent type name
    pub parent: String,
    /// Field on the child holding the parent's id
    pub field: String,
}

/// Single-valued link to another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkField {
    pub name: String,
    pub target: String,
    /// Name of the reverse accessor on the target type
    #[serde(default)]
    pub related_name: Option<String>,
    /// Hidden links cannot be navigated from the target side
    #[serde(default)]
    pub hidden: bool,
}

impl LinkField {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            related_name: None,
            hidden: false,
        }
    }

    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Reverse accessor name as seen from the target type.
    ///
    /// Defaults to `<owner>_set`.
    pub fn accessor_name(&self, owner: &str) -> String {
        match &self.related_name {
            Some(name) => name.clone(),
            None => format!("{}_set", owner.to_lowercase()),
        }
    }
}

/// Reverse side of a generic attachment: records of `target` whose
/// `tag_field` names this type and whose `id_field` holds this record's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericRelation {
    pub name: String,
    pub target: String,
    pub tag_field: String,
    pub id_field: String,
}

impl GenericRelation {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        tag_field: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            tag_field: tag_field.into(),
            id_field: id_field.into(),
        }
    }
}

/// Relations of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<ParentLink>,
    #[serde(default)]
    pub links: Vec<LinkField>,
    #[serde(default)]
    pub generic_relations: Vec<GenericRelation>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            links: Vec::new(),
            generic_relations: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: impl Into<String>, field: impl Into<String>) -> Self {
        self.parents.push(ParentLink {
            parent: parent.into(),
            field: field.into(),
        });
        self
    }

    pub fn link(mut self, link: LinkField) -> Self {
        self.links.push(link);
        self
    }

    pub fn generic(mut self, relation: GenericRelation) -> Self {
        self.generic_relations.push(relation);
        self
    }

    pub fn find_link(&self, name: &str) -> Option<&LinkField> {
        self.links.iter().find(|l| l.name == name)
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    models: Vec<ModelSchema>,
}

/// All declared entity types, by name.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelSchema>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from models; duplicate names are rejected.
    pub fn from_models(models: impl IntoIterator<Item = ModelSchema>) -> RegistryResult<Self> {
        let mut catalog = Self::new();
        for model in models {
            catalog.insert(model)?;
        }
        Ok(catalog)
    }

    /// Parse a catalog from JSON (`{"models": [...]}`).
    pub fn from_json(json: &str, source_name: &str) -> RegistryResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| RegistryError::invalid_catalog(source_name, format!("Invalid JSON: {}", e)))?;
        let catalog = Self::from_models(file.models)?;
        catalog.validate(source_name)?;
        Ok(catalog)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let source_name = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| {
            RegistryError::invalid_catalog(&source_name, format!("Failed to read file: {}", e))
        })?;
        let catalog = Self::from_json(&content, &source_name)?;
        let count = catalog.models.len().to_string();
        log_event(Event::CatalogLoaded, &[("path", &source_name), ("models", &count)]);
        Ok(catalog)
    }

    /// Serialize to the same JSON shape `from_json` reads.
    pub fn to_json(&self) -> String {
        let file = CatalogFile {
            models: self.models.values().cloned().collect(),
        };
        serde_json::to_string_pretty(&file).unwrap_or_default()
    }

    pub fn insert(&mut self, model: ModelSchema) -> RegistryResult<()> {
        if self.models.contains_key(&model.name) {
            return Err(RegistryError::DuplicateModel(model.name));
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModelSchema> {
        self.models.get(name)
    }

    pub fn require(&self, name: &str) -> RegistryResult<&ModelSchema> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelSchema> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Every referenced type must be declared.
    pub fn validate(&self, source_name: &str) -> RegistryResult<()> {
        for model in self.models.values() {
            let referenced = model
                .parents
                .iter()
                .map(|p| &p.parent)
                .chain(model.links.iter().map(|l| &l.target))
                .chain(model.generic_relations.iter().map(|g| &g.target));
            for target in referenced {
                if !self.models.contains_key(target) {
                    return Err(RegistryError::invalid_catalog(
                        source_name,
                        format!("'{}' references undeclared type '{}'", model.name, target),
                    ));
                }
            }
            self.ancestor_links(&model.name)?;
        }
        Ok(())
    }

    /// Parent links of every ancestor of `name`, most distant first.
    ///
    /// For C extends B extends A this is `[B's link to A, C's link to B]`.
    /// With several parents each parent's own chain comes before its link.
    /// A link field reached twice (diamond) is listed once.
    pub fn ancestor_links(&self, name: &str) -> RegistryResult<Vec<ParentLink>> {
        let mut out = Vec::new();
        let mut seen_fields = HashSet::new();
        let mut stack = Vec::new();
        self.collect_ancestor_links(name, &mut out, &mut seen_fields, &mut stack)?;
        Ok(out)
    }

    fn collect_ancestor_links(
        &self,
        name: &str,
        out: &mut Vec<ParentLink>,
        seen_fields: &mut HashSet<(String, String)>,
        stack: &mut Vec<String>,
    ) -> RegistryResult<()> {
        if stack.iter().any(|s| s == name) {
            return Err(RegistryError::ParentCycle(name.to_string()));
        }
        let model = self.require(name)?;
        stack.push(name.to_string());
        for link in &model.parents {
            self.collect_ancestor_links(&link.parent, out, seen_fields, stack)?;
            if seen_fields.insert((link.parent.clone(), link.field.clone())) {
                out.push(link.clone());
            }
        }
        stack.pop();
        Ok(())
    }

    /// `name` itself followed by all of its ancestor types.
    pub fn lineage(&self, name: &str) -> RegistryResult<Vec<String>> {
        let mut lineage = vec![name.to_string()];
        for link in self.ancestor_links(name)? {
            if !lineage.contains(&link.parent) {
                lineage.push(link.parent);
            }
        }
        Ok(lineage)
    }
}
