//! Primitive solid constructors.
//!
//! All primitives are closed manifolds with outward-facing windings, so they
//! can be fed directly into the boolean combinators. Curved surfaces use a
//! fixed tessellation; the interpreter exposes no resolution knob.

use std::f64::consts::TAU;

use crate::{
    csg::{Polygon3, Vertex},
    solid::Solid,
    vec3::Vec3,
};

/// Number of segments around the axis for spheres and cylinders.
const SLICES: usize = 16;
/// Number of latitude bands for spheres.
const STACKS: usize = 8;

fn quad(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Option<Polygon3> {
    Polygon3::new(vec![Vertex::new(a), Vertex::new(b), Vertex::new(c), Vertex::new(d)])
}

/// An axis-aligned box with one corner at the origin and the opposite corner
/// at `(l, w, h)`.
#[must_use]
pub fn cuboid(l: f64, w: f64, h: f64) -> Solid {
    let p = |x: f64, y: f64, z: f64| Vec3::new(x * l, y * w, z * h);
    let faces = [
        // bottom (z = 0), seen from below
        quad(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 0.0, 0.0)),
        // top (z = h)
        quad(p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)),
        // front (y = 0)
        quad(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 0.0, 1.0), p(0.0, 0.0, 1.0)),
        // back (y = w)
        quad(p(0.0, 1.0, 0.0), p(0.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, 0.0)),
        // left (x = 0)
        quad(p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(0.0, 1.0, 1.0), p(0.0, 1.0, 0.0)),
        // right (x = l)
        quad(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(1.0, 0.0, 1.0)),
    ];
    Solid::from_polygons(faces.into_iter().flatten().collect())
}

/// A UV sphere of radius `r` centered at the origin.
#[must_use]
pub fn sphere(r: f64) -> Solid {
    let vertex = |slice: usize, stack: usize| {
        let theta = TAU * (slice as f64) / (SLICES as f64);
        let phi = std::f64::consts::PI * (stack as f64) / (STACKS as f64);
        Vec3::new(
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        )
    };
    let mut polygons = Vec::new();
    for slice in 0..SLICES {
        for stack in 0..STACKS {
            let mut ring = vec![
                Vertex::new(vertex(slice, stack)),
                Vertex::new(vertex(slice, stack + 1)),
                Vertex::new(vertex(slice + 1, stack + 1)),
                Vertex::new(vertex(slice + 1, stack)),
            ];
            // Polar bands collapse one edge; drop the duplicated vertex so
            // the polygon stays strictly convex.
            ring.dedup_by(|a, b| (a.pos - b.pos).length() < 1e-12);
            while ring.len() > 1 && (ring[0].pos - ring[ring.len() - 1].pos).length() < 1e-12 {
                ring.pop();
            }
            if let Some(polygon) = Polygon3::new(ring) {
                polygons.push(polygon);
            }
        }
    }
    Solid::from_polygons(polygons)
}

/// A cylinder of radius `r` and height `h`, base on the XY plane, axis +Z.
#[must_use]
pub fn cylinder(r: f64, h: f64) -> Solid {
    let rim = |slice: usize, z: f64| {
        let theta = TAU * (slice as f64) / (SLICES as f64);
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    };
    let bottom_center = Vec3::ZERO;
    let top_center = Vec3::new(0.0, 0.0, h);
    let mut polygons = Vec::new();
    for slice in 0..SLICES {
        let next = slice + 1;
        // side
        if let Some(polygon) = quad(rim(slice, 0.0), rim(next, 0.0), rim(next, h), rim(slice, h)) {
            polygons.push(polygon);
        }
        // bottom cap, wound to face -Z
        if let Some(polygon) = Polygon3::new(vec![
            Vertex::new(bottom_center),
            Vertex::new(rim(next, 0.0)),
            Vertex::new(rim(slice, 0.0)),
        ]) {
            polygons.push(polygon);
        }
        // top cap, wound to face +Z
        if let Some(polygon) = Polygon3::new(vec![
            Vertex::new(top_center),
            Vertex::new(rim(slice, h)),
            Vertex::new(rim(next, h)),
        ]) {
            polygons.push(polygon);
        }
    }
    Solid::from_polygons(polygons)
}
