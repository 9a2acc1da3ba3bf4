//! Core data models: the BibTeX database and the papers resolved from it.

pub mod bibtex;
mod paper;

pub use bibtex::{BibDatabase, BibError, FILE_FIELD};
pub use paper::{Paper, PaperError, PaperState, Unavailable};
