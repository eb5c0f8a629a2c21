pub mod digests;
pub mod filters;
pub mod reddit;
pub mod render;
pub mod settings;
pub mod store;
