//! Sans-IO core of the atlas resource repository toolkit.
//!
//! A repository holds XML resource documents addressed by identifiers like
//! `Library://Data/Roads.FeatureSource`; documents reference each other by
//! embedding those identifiers. This crate keeps the reference graph
//! consistent when resources move: the [`rewrite`] module repoints
//! identifiers inside a single deserialized resource, and the
//! [`orchestrate`] module sequences whole move/copy operations over a
//! [`store::ResourceStore`], reporting progress and honoring cooperative
//! cancellation.
//!
//! Everything here is synchronous and IO-free apart from the store trait;
//! bring your own storage backend or use the bundled
//! [`store::MemoryStore`].

pub mod codec;
pub mod error;
pub mod markup;
pub mod model;
pub mod orchestrate;
pub mod resource_id;
pub mod rewrite;
pub mod store;

pub use error::{Error, Result};
pub use markup::{MarkupDocument, MarkupElement};
pub use model::{ResourceKind, TypedResource};
pub use orchestrate::{
    copy_folder_with_references, move_folder_with_references, move_resource_with_references,
    BatchOutcome, CancelFlag, NullProgress, ProgressSink, WorkItem, WorkStatus,
};
pub use rewrite::{rewrite, ResourceGraphNode, RewritePass, UpdateMode, VisitReferences};
pub use store::{MemoryStore, ResourceEntry, ResourceStore};
