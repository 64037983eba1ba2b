//! # Canvas Studio I/O
//!
//! File-backed persistence for the editor: the JSON snapshot table that
//! mirrors the undo history, and the `settings.json` file holding history and
//! scheduler tunables.

pub mod settings;
pub mod store;

pub use settings::{SettingsError, StudioSettings};
pub use store::JsonFileStore;
