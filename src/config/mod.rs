//! Layered configuration: sources, merging, sections and binding.

mod bind;
mod builder;
mod change;
mod env;
mod error;
mod fetch;
mod file;
mod memory;
mod merge;
mod path;
mod section;
mod source;
mod store;

pub use bind::{BoundOptions, FieldDescriptor, FieldKind, Options, OptionsShape};
pub use builder::ConfigBuilder;
pub use change::{diff, ChangeEvent, ChangeNotification, Subscription};
pub use env::EnvSource;
pub use error::{ConfigError, SourceFailure};
pub use fetch::{Fetch, FetchError, FetchSource};
pub use file::FileSource;
pub use memory::MemorySource;
pub use merge::{merge, Snapshot};
pub use path::{KeyPath, KEY_DELIMITER};
pub use section::Section;
pub use source::{flatten_json, flatten_toml, ConfigEntry, ConfigSource, Format};
pub use store::{CancelToken, ConfigurationStore, StoreState};
