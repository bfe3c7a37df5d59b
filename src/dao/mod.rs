/// Song selection collaborator and its in-memory catalog.
pub mod catalog;
/// Per-guild preferences collaborator.
pub mod preferences;
/// Error shared by collaborator backends.
pub mod storage;
