//! Geometry, collision detection and sheet layouts for 2D irregular nesting.
//!
//! Pieces are placed on whole sheets, packages or continuous strips. Every sheet is represented by a
//! [`Layout`](entities::Layout), which keeps a [`CDEngine`](collision_detection::CDEngine) to verify
//! that no two placed pieces overlap.

/// Everything related to the Collision Detection Engine
pub mod collision_detection;

/// Entities to model nesting problems: pieces, sheets and their layouts
pub mod entities;

/// Geometric primitives and base algorithms
pub mod geometry;

/// Importing problem instances into and exporting solutions out of this library
pub mod io;

/// Helper functions which do not belong to any specific module
pub mod util;
