pub mod rag_store;
pub mod traits;
pub mod turso;

pub use traits::{DatabaseClient, DatabaseProvider};
pub use turso::TursoClient;
