pub mod analysis;
pub mod config;
pub mod corpus;
pub mod crawl;
pub mod error;
pub mod filter;
pub mod report;
pub mod taxonomy;

pub use config::Settings;
pub use corpus::Corpus;
pub use crawl::Sample;
pub use error::{Error, Result};
pub use filter::{FilterState, Query};
pub use taxonomy::{Dimension, Taxonomy};
