pub mod config;
pub mod entry;
pub mod error;
pub mod types;

pub use config::IndexConfig;
pub use entry::{Entry, MasterItem};
pub use types::{Dimension, Item, ItemKind, Person};
