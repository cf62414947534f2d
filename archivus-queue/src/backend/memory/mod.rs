pub mod storage;
pub mod reaper;

pub use storage::MemoryBackend;
pub use reaper::LeaseReaper;
