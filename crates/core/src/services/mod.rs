//! Business logic services.

pub mod directory_session;
pub mod document;
pub mod lifecycle;
pub mod overview;
pub mod person_directory;

#[cfg(test)]
pub(crate) mod test_support;

pub use directory_session::{CacheKeyFn, CacheScope, DirectorySession};
pub use document::{ConfirmationDocument, DocumentPerson, DocumentRenderer, HtmlDocumentRenderer};
pub use lifecycle::{CreateRequestInput, LifecycleService};
pub use overview::{CoParentOverview, OverviewService, PartyOverview, RequestSummary};
pub use person_directory::{
    CoParentRelation, DirectoryError, FamilyMember, FamilyRelations, HttpPersonDirectory,
    PersonDirectory, PersonInfo,
};
