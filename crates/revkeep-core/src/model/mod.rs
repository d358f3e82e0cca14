pub mod catalog;
pub mod history;
pub mod record;
pub mod value;

pub use catalog::{Catalog, FieldDef, FieldKind, OwnedField, ParentLink, TypeSchema};
pub use history::{Action, MetaRecord, Revision, RevisionDraft, Version, VersionDraft, WindowQuery};
pub use record::Record;
pub use value::FieldValue;
