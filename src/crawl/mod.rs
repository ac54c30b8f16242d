pub mod client;
pub mod form;
pub mod results;
pub mod worker;

pub use client::{CrawlClient, CrawlConfig, Stage};
pub use form::FormState;
pub use results::{PageKind, Sample};
pub use worker::CrawlWorker;
