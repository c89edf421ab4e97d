//! Linked server registry.

pub mod store;

pub use store::RegistryStore;
