//! A "prelude" for users of the `pagewalk-core` crate.
//!
//! This prelude re-exports the most commonly used traits, structs, and macros
//! so that they can be easily imported.
//!
//! # Example
//!
//! ```
//! use pagewalk_core::prelude::*;
//! ```

pub use crate::{
    // Core structs
    Engine,
    EngineBuilder,
    Strategy,
    // Core traits
    Extractor,
    // Types used when implementing an extractor
    Discovered,
    ItemSender,
    PagewalkError,
    // Essential re-exports for trait implementation
    CancellationToken,
    async_trait,
};
