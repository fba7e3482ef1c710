//! Registration graph
//!
//! Decides, for each tracked entity type, which related records are captured
//! with it in one revision:
//! - `ModelCatalog`: declarative relations supplied by the host
//! - `Registry`: write-once registrations, autoregistration of ancestors,
//!   follow-field resolution and the capture walk
//! - part-of discovery for inline-style child records
//! - per-type snapshot serializers

mod catalog;
mod errors;
mod graph;
mod part;
mod serializer;

pub use catalog::{GenericRelation, LinkField, ModelCatalog, ModelSchema, ParentLink};
pub use errors::{RegistryError, RegistryResult};
pub use graph::{FollowPath, Registration, RegistrationOptions, Registry};
pub use part::{resolve_part, resolve_part_strict, PartDescriptor, ResolvedPart};
pub use serializer::{EntitySerializer, JsonSerializer, SerializationError};
