//! Polycube enumeration engine.
//!
//! Grows the complete set of rotation-distinct polycubes of size `n` from the
//! set of size `n - 1`, one cell at a time, and persists every finished
//! generation so later runs resume instead of recomputing.
//!
//! # Example
//!
//! ```
//! use polycube::{Generator, MemoryStore};
//!
//! let mut generator = Generator::new(MemoryStore::new());
//! let tetracubes = generator.advance_to(4).unwrap();
//! assert_eq!(tetracubes.len(), 8);
//! ```

pub mod config;
pub mod dedup;
pub mod direction;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod grid;
pub mod grow;
pub mod orchestrator;
pub mod orientation;
pub mod store;

pub use config::GeneratorConfig;
pub use dedup::{dedup, DedupStats, Deduplicator};
pub use direction::Direction;
pub use error::{PolycubeError, Result};
pub use fingerprint::Fingerprint;
pub use generation::{class_key, validate_shapes, Generation};
pub use grid::{Grid, GridDecodeError, GridRecord};
pub use grow::{grow, Grower};
pub use orchestrator::{next_generation, Generator, Health, Progress};
pub use orientation::{orientations, Orientation};
pub use store::{FileStore, GenerationStore, MemoryStore};

// Re-export glam for convenience
pub use glam;
