pub mod types;
pub mod writer;

pub use types::{FileContent, ManagedFile, WriteOutcome};
pub use writer::{FileWriter, LocalWriter};
