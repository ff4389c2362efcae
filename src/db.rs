pub mod document_store;
pub use document_store::{DocumentStore, Subscription};
pub mod memory_store;
pub use memory_store::MemoryDocumentStore;
pub mod pg_store;
pub use pg_store::PgDocumentStore;
pub mod local_cache;
pub use local_cache::{FileLocalCache, LocalCache, MemoryLocalCache};
pub mod entity_repo;
pub use entity_repo::{EntityRepository, Loaded, PersistOutcome, Scope};
pub mod entities;
pub mod derived;
pub mod portfolio_repo;
pub use portfolio_repo::PortfolioRepository;
