pub mod match_store;
pub mod memory_store;
pub mod pool;
