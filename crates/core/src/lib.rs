//! Domain logic for the car-mod overlay studio.
//!
//! Pure, synchronous building blocks: coordinate math, the overlay scene
//! model, pointer/keyboard interaction, placement compilation, instruction
//! text, and reconciliation of generated images. No I/O happens here.

pub mod assets;
pub mod catalog;
pub mod error;
pub mod geometry;
pub mod instruction;
pub mod interaction;
pub mod payload;
pub mod placement;
pub mod reconcile;
pub mod scene;
pub mod types;
