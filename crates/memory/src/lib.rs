//! Storage implementations for llmbind: chat memory windows and the
//! retrieval corpus.

pub mod corpus;
pub mod file_store;
pub mod in_memory;
pub mod vector;
pub mod window;

pub use corpus::InMemoryCorpus;
pub use file_store::FileChatStore;
pub use in_memory::InMemoryChatStore;
pub use vector::{cosine_similarity, rank_by_similarity};
pub use window::ChatMemoryWindow;
