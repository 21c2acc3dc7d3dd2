//! Storage implementations backing resource models

pub mod in_memory;

pub use in_memory::InMemoryStore;
