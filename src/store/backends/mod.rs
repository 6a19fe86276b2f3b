//! Record collection implementations

pub mod memory;

pub use memory::MemoryCollection;
