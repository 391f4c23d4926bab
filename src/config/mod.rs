pub mod settings;
pub mod sources;
