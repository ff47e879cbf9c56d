//! Result cache: request fingerprints and the artifact store they index.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheStats, CacheStore, RecipeCache};
