mod config;
mod error;
mod language_pack;
mod walk;

pub use config::DiscoveryConfig;
pub use error::{DiscoveryError, Result};
pub use language_pack::{LanguagePack, RustLanguagePack};
pub use walk::{discover, LanguagePackRegistry};
