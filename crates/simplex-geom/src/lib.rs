//! CSG geometry kernel for the Simplex solid-modeling language.
//!
//! The kernel represents solids as soups of planar convex polygons and
//! implements boolean operations with BSP-tree clipping. Handles are
//! immutable: every combinator and transform returns a new [`Solid`].
//!
//! The interpreter consumes this crate strictly through [`Solid`] and
//! [`Polygon2`]; the BSP internals are private.

mod csg;
mod polygon;
mod primitives;
mod solid;
mod stl;
mod vec3;

pub use crate::{
    polygon::Polygon2,
    primitives::{cuboid, cylinder, sphere},
    solid::{Bounds, Solid},
    vec3::Vec3,
};
