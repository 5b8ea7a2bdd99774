//! Tempo decomposition, timeline planning and filter-graph compilation.

pub mod graph;
pub mod plan;
pub mod tempo;

pub use graph::{compile, BufferRef, FilterKind, FilterOp, FilterProgram, InputBindings};
pub use plan::{plan_timeline, validate_edits, PlacedEdit, Segment};
pub use tempo::build_tempo_chain;
