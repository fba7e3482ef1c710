//! Part-of relation discovery
//!
//! A host declares that records of some part type are edited together with a
//! root record (the way inline rows belong to a parent form). Resolution
//! finds the follow field on the root that enumerates those parts.

use serde::{Deserialize, Serialize};

use super::catalog::ModelCatalog;
use super::errors::{RegistryError, RegistryResult};

/// A declared part-of relation, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartDescriptor {
    /// Part records hold a link field pointing at the root
    Direct {
        part_type: String,
        #[serde(default)]
        link_field: Option<String>,
    },
    /// Part records are attached by a tag field plus a target-id field
    Generic {
        part_type: String,
        tag_field: String,
        id_field: String,
    },
}

impl PartDescriptor {
    /// Direct part whose link field is discovered by scanning
    pub fn direct(part_type: impl Into<String>) -> Self {
        PartDescriptor::Direct {
            part_type: part_type.into(),
            link_field: None,
        }
    }

    /// Direct part through an explicit link field
    pub fn direct_via(part_type: impl Into<String>, link_field: impl Into<String>) -> Self {
        PartDescriptor::Direct {
            part_type: part_type.into(),
            link_field: Some(link_field.into()),
        }
    }

    pub fn generic(
        part_type: impl Into<String>,
        tag_field: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        PartDescriptor::Generic {
            part_type: part_type.into(),
            tag_field: tag_field.into(),
            id_field: id_field.into(),
        }
    }

    pub fn part_type(&self) -> &str {
        match self {
            PartDescriptor::Direct { part_type, .. } => part_type,
            PartDescriptor::Generic { part_type, .. } => part_type,
        }
    }
}

/// Outcome of resolving a part descriptor against a root type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPart {
    pub part_type: String,
    /// Field on the root enumerating parts; `None` means tracked one-way only
    pub follow_field: Option<String>,
    /// Field on the part (or the generic id field) that links back
    pub link_field: Option<String>,
}

/// Resolve `descriptor` against `root`.
///
/// "No follow field" is a valid outcome here; callers that need one use
/// `resolve_part_strict`.
pub fn resolve_part(
    catalog: &ModelCatalog,
    root: &str,
    descriptor: &PartDescriptor,
) -> RegistryResult<ResolvedPart> {
    let root_model = catalog.require(root)?;
    let part_model = catalog.require(descriptor.part_type())?;

    match descriptor {
        PartDescriptor::Generic {
            part_type,
            tag_field,
            id_field,
        } => {
            let follow_field = root_model
                .generic_relations
                .iter()
                .find(|rel| {
                    &rel.target == part_type && &rel.tag_field == tag_field && &rel.id_field == id_field
                })
                .map(|rel| rel.name.clone());
            Ok(ResolvedPart {
                part_type: part_type.clone(),
                follow_field,
                link_field: Some(id_field.clone()),
            })
        }
        PartDescriptor::Direct {
            part_type,
            link_field,
        } => {
            let lineage = catalog.lineage(root)?;
            let link = match link_field {
                Some(name) => {
                    let link = part_model
                        .find_link(name)
                        .ok_or_else(|| RegistryError::unknown_field(part_type, name))?;
                    if !lineage.contains(&link.target) {
                        return Err(RegistryError::AmbiguousRelation {
                            root_type: root.to_string(),
                            part_type: part_type.clone(),
                            reason: format!("link '{}' targets '{}'", name, link.target),
                        });
                    }
                    Some(link)
                }
                None => part_model.links.iter().find(|l| lineage.contains(&l.target)),
            };

            let Some(link) = link else {
                return Ok(ResolvedPart {
                    part_type: part_type.clone(),
                    follow_field: None,
                    link_field: None,
                });
            };

            let follow_field = if link.hidden {
                None
            } else {
                Some(link.accessor_name(part_type))
            };
            Ok(ResolvedPart {
                part_type: part_type.clone(),
                follow_field,
                link_field: Some(link.name.clone()),
            })
        }
    }
}

/// Like `resolve_part`, but a missing follow field is `AmbiguousRelation`.
pub fn resolve_part_strict(
    catalog: &ModelCatalog,
    root: &str,
    descriptor: &PartDescriptor,
) -> RegistryResult<ResolvedPart> {
    let resolved = resolve_part(catalog, root, descriptor)?;
    if resolved.follow_field.is_none() {
        let reason = match (&resolved.link_field, descriptor) {
            (_, PartDescriptor::Generic { .. }) => "no matching generic relation on root".to_string(),
            (Some(link), _) => format!("link '{}' is hidden", link),
            (None, _) => "no link field back to root".to_string(),
        };
        return Err(RegistryError::AmbiguousRelation {
            root_type: root.to_string(),
            part_type: resolved.part_type,
            reason,
        });
    }
    Ok(resolved)
}
