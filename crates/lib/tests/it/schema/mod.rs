//! Schema integration tests
//!
//! This module tests document type declarations: key resolution through
//! embeds, mapped names, index resolution and inheritance between types.

mod inheritance;
