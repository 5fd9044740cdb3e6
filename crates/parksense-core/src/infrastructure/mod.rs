//! Infrastructure layer: file-system adapters.
//!
//! **Dependency rule**: this layer may depend on `domain`, but the domain
//! never imports from here.

pub mod storage;
