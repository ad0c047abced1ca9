mod parsing;
mod settings;
mod types;

#[cfg(test)]
pub(crate) use types::ConfigError;
pub(crate) use types::{Settings, StorageSettings};
