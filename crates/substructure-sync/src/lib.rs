//! Substructure Sync: turn-by-turn growth of a query substructure
//!
//! Each user turn is mapped (usually by a language model) to items of the
//! data specification. This crate folds those mappings into the
//! conversation's substructure graph and keeps the selection lifecycle that
//! lets a user pick properties and send a suggested message.
//!
//! ```text
//!   user text ──► start_turn ──► (mapper) ──► ItemMappings
//!                                                 │
//!                         selections ─────────────┤
//!                                                 ▼
//!   ItemCatalog ──────────────────────────────► Merger ──► SubstructureGraph
//!                                                 │               │
//!                                   explicit + implicit           ▼
//!                                       mappings log        SparqlCompiler
//! ```

pub mod conversation;
pub mod merger;
pub mod selection;

pub use conversation::{Conversation, ConversationError, ConversationId, Turn};
pub use merger::{MergeConfig, MergeError, MergeOutcome, Merger, UnresolvedPolicy};
pub use selection::{replace_selections, SelectionError, SelectionState};
