//! CLI commands

mod completions;
mod key;
mod team;

pub use completions::CompletionsCommand;
pub use key::KeyCommand;
pub use team::TeamCommand;
