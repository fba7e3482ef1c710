//! Registration graph
//!
//! Records which entity types are tracked and, for each, which follow fields
//! lead to records that must be captured in the same revision. Registrations
//! are write-once: created during host setup and never changed afterwards.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::catalog::ModelCatalog;
use super::errors::{RegistryError, RegistryResult};
use super::part::{resolve_part, resolve_part_strict, PartDescriptor, ResolvedPart};
use super::serializer::{EntitySerializer, JsonSerializer};
use crate::observability::{log_event, Event};
use crate::storage::{EntityKey, EntityStore, Record};

/// How one follow field reaches related records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowPath {
    /// Link to a parent type; a missing field means the parent shares the id
    Parent { field: String, parent_type: String },
    /// Forward link field on this record
    Forward { field: String, target_type: String },
    /// Records of `part_type` whose `link_field` holds this record's id
    Reverse {
        accessor: String,
        part_type: String,
        link_field: String,
    },
    /// Records of `part_type` attached through a tag + id pair
    Generic {
        name: String,
        part_type: String,
        tag_field: String,
        id_field: String,
    },
}

impl FollowPath {
    /// Records reachable from `record` through this path
    pub fn targets(&self, store: &dyn EntityStore, record: &Record) -> Vec<Record> {
        match self {
            FollowPath::Parent { field, parent_type } => {
                let id = record.link_id(field).unwrap_or_else(|| record.id().to_string());
                store.get(&EntityKey::new(parent_type, id)).into_iter().collect()
            }
            FollowPath::Forward { field, target_type } => record
                .link_id(field)
                .and_then(|id| store.get(&EntityKey::new(target_type, id)))
                .into_iter()
                .collect(),
            FollowPath::Reverse {
                part_type,
                link_field,
                ..
            } => store
                .scan(part_type)
                .into_iter()
                .filter(|part| part.link_id(link_field).as_deref() == Some(record.id()))
                .collect(),
            FollowPath::Generic {
                part_type,
                tag_field,
                id_field,
                ..
            } => store
                .scan(part_type)
                .into_iter()
                .filter(|part| {
                    part.link_id(tag_field).as_deref() == Some(record.entity_type())
                        && part.link_id(id_field).as_deref() == Some(record.id())
                })
                .collect(),
        }
    }
}

/// Options for registering one type.
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    follow: Vec<String>,
    serializer: Option<Arc<dyn EntitySerializer>>,
    label_field: Option<String>,
}

impl RegistrationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.follow.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn EntitySerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Field whose value labels snapshots of this type
    pub fn label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }
}

/// Registration record of one tracked type.
#[derive(Debug, Clone)]
pub struct Registration {
    entity_type: String,
    follow: Vec<String>,
    paths: Vec<FollowPath>,
    serializer: Arc<dyn EntitySerializer>,
    label_field: Option<String>,
}

impl Registration {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Follow fields in first-seen order, without duplicates
    pub fn follow(&self) -> &[String] {
        &self.follow
    }

    pub fn paths(&self) -> &[FollowPath] {
        &self.paths
    }

    pub fn serializer(&self) -> &dyn EntitySerializer {
        self.serializer.as_ref()
    }

    /// Human-readable label stored with each snapshot
    pub fn label_for(&self, record: &Record) -> String {
        self.label_field
            .as_deref()
            .and_then(|field| record.display_field(field))
            .unwrap_or_else(|| format!("{} object ({})", record.entity_type(), record.id()))
    }
}

/// The set of tracked types, owned by the host's setup code.
#[derive(Debug)]
pub struct Registry {
    catalog: ModelCatalog,
    registrations: Vec<Registration>,
    default_serializer: Arc<dyn EntitySerializer>,
}

impl Registry {
    pub fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            registrations: Vec::new(),
            default_serializer: Arc::new(JsonSerializer),
        }
    }

    /// Serializer used by registrations that do not name their own
    pub fn with_default_serializer(mut self, serializer: Arc<dyn EntitySerializer>) -> Self {
        self.default_serializer = serializer;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn is_registered(&self, entity_type: &str) -> bool {
        self.registration(entity_type).is_some()
    }

    pub fn registration(&self, entity_type: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.entity_type == entity_type)
    }

    pub fn require(&self, entity_type: &str) -> RegistryResult<&Registration> {
        self.registration(entity_type)
            .ok_or_else(|| RegistryError::UnknownType(entity_type.to_string()))
    }

    /// Registered type names in registration order
    pub fn registration_order(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.entity_type.as_str()).collect()
    }

    /// Register a type with the given follow fields.
    pub fn register<I, S>(&mut self, entity_type: &str, follow: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_with(entity_type, RegistrationOptions::new().follow(follow))
    }

    /// Register a type. Registering the same type twice is an error.
    pub fn register_with(&mut self, entity_type: &str, options: RegistrationOptions) -> RegistryResult<()> {
        if self.is_registered(entity_type) {
            return Err(RegistryError::AlreadyRegistered(entity_type.to_string()));
        }
        self.catalog.require(entity_type)?;

        let mut follow: Vec<String> = Vec::new();
        for field in options.follow {
            if !follow.contains(&field) {
                follow.push(field);
            }
        }
        let paths = follow
            .iter()
            .map(|field| self.resolve_follow(entity_type, field))
            .collect::<RegistryResult<Vec<_>>>()?;

        let joined = follow.join(",");
        self.registrations.push(Registration {
            entity_type: entity_type.to_string(),
            follow,
            paths,
            serializer: options
                .serializer
                .unwrap_or_else(|| Arc::clone(&self.default_serializer)),
            label_field: options.label_field,
        });
        log_event(
            Event::TypeRegistered,
            &[("entity_type", entity_type), ("follow", &joined)],
        );
        Ok(())
    }

    /// Register a type and, before it, every ancestor type.
    ///
    /// Idempotent: an already registered type is left untouched. The
    /// resulting follow list is the ancestor link fields (most distant first)
    /// followed by `extra_follow`.
    pub fn autoregister<I, S>(&mut self, entity_type: &str, extra_follow: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autoregister_with(entity_type, RegistrationOptions::new().follow(extra_follow))
    }

    pub fn autoregister_with(&mut self, entity_type: &str, options: RegistrationOptions) -> RegistryResult<()> {
        if self.is_registered(entity_type) {
            return Ok(());
        }
        let links = self.catalog.ancestor_links(entity_type)?;
        let mut follow = Vec::with_capacity(links.len() + options.follow.len());
        for link in links {
            self.autoregister(&link.parent, std::iter::empty::<String>())?;
            follow.push(link.field);
        }
        follow.extend(options.follow);
        self.register_with(entity_type, RegistrationOptions { follow, ..options })
    }

    /// Resolve one part-of relation against `root`.
    pub fn resolve_part(&self, root: &str, descriptor: &PartDescriptor) -> RegistryResult<ResolvedPart> {
        let resolved = resolve_part(&self.catalog, root, descriptor)?;
        log_event(
            Event::PartResolved,
            &[
                ("root_type", root),
                ("part_type", &resolved.part_type),
                ("follow_field", resolved.follow_field.as_deref().unwrap_or("")),
            ],
        );
        Ok(resolved)
    }

    pub fn resolve_part_strict(&self, root: &str, descriptor: &PartDescriptor) -> RegistryResult<ResolvedPart> {
        resolve_part_strict(&self.catalog, root, descriptor)
    }

    /// Register a root type together with its declared parts.
    ///
    /// Each part type is autoregistered first; the follow fields of parts
    /// that have one are added to the root's own follow list.
    pub fn register_root(
        &mut self,
        root: &str,
        parts: &[PartDescriptor],
        options: RegistrationOptions,
    ) -> RegistryResult<Vec<ResolvedPart>> {
        let resolved = parts
            .iter()
            .map(|descriptor| self.resolve_part(root, descriptor))
            .collect::<RegistryResult<Vec<_>>>()?;
        if self.is_registered(root) {
            return Ok(resolved);
        }
        let mut follow = Vec::new();
        for part in &resolved {
            self.autoregister(&part.part_type, std::iter::empty::<String>())?;
            if let Some(field) = &part.follow_field {
                follow.push(field.clone());
            }
        }
        self.autoregister_with(root, options.follow(follow))?;
        Ok(resolved)
    }

    fn resolve_follow(&self, entity_type: &str, field: &str) -> RegistryResult<FollowPath> {
        if let Some(link) = self
            .catalog
            .ancestor_links(entity_type)?
            .into_iter()
            .find(|l| l.field == field)
        {
            return Ok(FollowPath::Parent {
                field: link.field,
                parent_type: link.parent,
            });
        }

        let model = self.catalog.require(entity_type)?;
        if let Some(link) = model.find_link(field) {
            return Ok(FollowPath::Forward {
                field: link.name.clone(),
                target_type: link.target.clone(),
            });
        }
        if let Some(rel) = model.generic_relations.iter().find(|g| g.name == field) {
            return Ok(FollowPath::Generic {
                name: rel.name.clone(),
                part_type: rel.target.clone(),
                tag_field: rel.tag_field.clone(),
                id_field: rel.id_field.clone(),
            });
        }

        let lineage = self.catalog.lineage(entity_type)?;
        for other in self.catalog.models() {
            for link in &other.links {
                if !link.hidden
                    && lineage.contains(&link.target)
                    && link.accessor_name(&other.name) == field
                {
                    return Ok(FollowPath::Reverse {
                        accessor: field.to_string(),
                        part_type: other.name.clone(),
                        link_field: link.name.clone(),
                    });
                }
            }
        }

        Err(RegistryError::unknown_field(entity_type, field))
    }

    /// Records one step away from `record` through its follow paths.
    ///
    /// Empty for unregistered types.
    pub fn follow_targets(&self, store: &dyn EntityStore, record: &Record) -> Vec<Record> {
        self.registration(record.entity_type())
            .map(|registration| {
                registration
                    .paths()
                    .iter()
                    .flat_map(|path| path.targets(store, record))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records to capture together with `roots`, in discovery order.
    ///
    /// Breadth-first over follow paths of registered types; each record is
    /// visited once, so cyclic relations terminate. Unregistered records are
    /// neither captured nor followed.
    pub fn collect_related(&self, store: &dyn EntityStore, roots: Vec<Record>) -> Vec<Record> {
        let mut seen: HashSet<EntityKey> = HashSet::new();
        let mut queue: VecDeque<Record> = VecDeque::new();
        let mut out = Vec::new();

        for record in roots {
            if self.is_registered(record.entity_type()) && seen.insert(record.key().clone()) {
                queue.push_back(record);
            }
        }
        while let Some(record) = queue.pop_front() {
            for target in self.follow_targets(store, &record) {
                if self.is_registered(target.entity_type()) && seen.insert(target.key().clone()) {
                    queue.push_back(target);
                }
            }
            out.push(record);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::catalog::{GenericRelation, LinkField, ModelSchema};
    use crate::storage::MemoryDatabase;

    fn blog_catalog() -> ModelCatalog {
        ModelCatalog::from_models([
            ModelSchema::new("post")
                .link(LinkField::new("author", "author"))
                .generic(GenericRelation::new("tags", "tag", "object_type", "object_id")),
            ModelSchema::new("author"),
            ModelSchema::new("comment").link(LinkField::new("post", "post")),
            ModelSchema::new("tag"),
        ])
        .unwrap()
    }

    #[test]
    fn test_register_dedupes_follow_preserving_order() {
        let mut registry = Registry::new(blog_catalog());
        registry
            .register("post", ["comment_set", "author", "comment_set", "tags"])
            .unwrap();
        assert_eq!(
            registry.registration("post").unwrap().follow(),
            &["comment_set", "author", "tags"]
        );
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut registry = Registry::new(blog_catalog());
        registry.register("tag", Vec::<String>::new()).unwrap();
        let err = registry.register("tag", Vec::<String>::new()).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("tag".into()));
    }

    #[test]
    fn test_unknown_follow_field_rejected_at_setup() {
        let mut registry = Registry::new(blog_catalog());
        let err = registry.register("post", ["nonexistent"]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownField { .. }));
        assert!(!registry.is_registered("post"));
    }

    #[test]
    fn test_follow_paths_resolved() {
        let mut registry = Registry::new(blog_catalog());
        registry.register("post", ["author", "comment_set", "tags"]).unwrap();
        let paths = registry.registration("post").unwrap().paths();
        assert!(matches!(paths[0], FollowPath::Forward { .. }));
        assert!(matches!(paths[1], FollowPath::Reverse { .. }));
        assert!(matches!(paths[2], FollowPath::Generic { .. }));
    }

    #[test]
    fn test_label_for() {
        let mut registry = Registry::new(blog_catalog());
        registry
            .register_with("post", RegistrationOptions::new().label_field("title"))
            .unwrap();
        registry.register("tag", Vec::<String>::new()).unwrap();

        let post = Record::new(EntityKey::new("post", "1")).field("title", "Hello");
        let tag = Record::new(EntityKey::new("tag", "7"));
        assert_eq!(registry.require("post").unwrap().label_for(&post), "Hello");
        assert_eq!(registry.require("tag").unwrap().label_for(&tag), "tag object (7)");
    }

    #[test]
    fn test_collect_related_walks_all_paths_once() {
        let mut registry = Registry::new(blog_catalog());
        registry.register("post", ["author", "comment_set", "tags"]).unwrap();
        registry.register("comment", ["post"]).unwrap();
        registry.register("tag", Vec::<String>::new()).unwrap();

        let mut db = MemoryDatabase::new();
        let post = Record::new(EntityKey::new("post", "1")).field("author", "a1");
        db.put(post.clone()).unwrap();
        db.put(Record::new(EntityKey::new("author", "a1"))).unwrap();
        db.put(Record::new(EntityKey::new("comment", "c1")).field("post", "1")).unwrap();
        db.put(Record::new(EntityKey::new("comment", "c2")).field("post", "2")).unwrap();
        db.put(
            Record::new(EntityKey::new("tag", "t1"))
                .field("object_type", "post")
                .field("object_id", "1"),
        )
        .unwrap();
        db.put(
            Record::new(EntityKey::new("tag", "t2"))
                .field("object_type", "comment")
                .field("object_id", "1"),
        )
        .unwrap();

        let keys: Vec<String> = registry
            .collect_related(&db, vec![post])
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        // author is unregistered; comment c1 links back to post 1 but is seen once.
        assert_eq!(keys, vec!["post:1", "comment:c1", "tag:t1"]);
    }
}
