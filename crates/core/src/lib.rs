pub mod config;
pub mod error;
pub mod fetch;
pub mod input;

pub use config::Config;
pub use error::*;
pub use fetch::*;
pub use input::isrcs_from_csv;
