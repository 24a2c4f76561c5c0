//! Parsing and in-memory representation of ECMA-335 CLI metadata: the PE data directory entry,
//! the metadata root and its five heaps, the `#~` table stream, and the token/index vocabulary
//! tying them together.

pub mod heaps;
pub mod indices;
pub mod root;
pub mod table;
