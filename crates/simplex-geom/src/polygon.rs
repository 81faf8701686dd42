//! Planar polygons and prism extrusion.

use crate::{
    csg::{Polygon3, Vertex},
    solid::Solid,
    vec3::Vec3,
};

/// A simple (non-self-intersecting) polygon in the XY plane.
///
/// Vertex order may be clockwise or counter-clockwise; operations that care
/// about orientation normalize internally. Immutable like [`Solid`]:
/// transforms return new handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2 {
    vertices: Vec<(f64, f64)>,
}

impl Polygon2 {
    /// Builds a polygon from its outline. Returns `None` with fewer than
    /// three vertices.
    #[must_use]
    pub fn new(vertices: Vec<(f64, f64)>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        Some(Self { vertices })
    }

    #[must_use]
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Absolute enclosed area (shoelace formula).
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let mut sum = 0.0;
        for i in 0..n {
            let (x1, y1) = self.vertices[i];
            let (x2, y2) = self.vertices[(i + 1) % n];
            sum += x1 * y2 - x2 * y1;
        }
        sum / 2.0
    }

    /// Translation within the plane.
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            vertices: self.vertices.iter().map(|&(x, y)| (x + dx, y + dy)).collect(),
        }
    }

    /// Extrudes the polygon along +Z into a prism of the given height.
    ///
    /// Caps are ear-clip triangulated so concave outlines extrude correctly.
    /// Returns the empty solid for degenerate outlines or non-positive
    /// heights.
    #[must_use]
    pub fn extrude(&self, height: f64) -> Solid {
        if height <= 0.0 {
            return Solid::empty();
        }
        // Work on a counter-clockwise outline so side quads face outward.
        let mut outline = self.vertices.clone();
        if self.signed_area() < 0.0 {
            outline.reverse();
        }
        let triangles = ear_clip(&outline);
        if triangles.is_empty() {
            return Solid::empty();
        }

        let bottom = |&(x, y): &(f64, f64)| Vec3::new(x, y, 0.0);
        let top = |&(x, y): &(f64, f64)| Vec3::new(x, y, height);
        let mut polygons = Vec::new();
        for [a, b, c] in &triangles {
            // bottom cap faces -Z: reverse the CCW triangle
            if let Some(polygon) = Polygon3::new(vec![
                Vertex::new(bottom(c)),
                Vertex::new(bottom(b)),
                Vertex::new(bottom(a)),
            ]) {
                polygons.push(polygon);
            }
            if let Some(polygon) =
                Polygon3::new(vec![Vertex::new(top(a)), Vertex::new(top(b)), Vertex::new(top(c))])
            {
                polygons.push(polygon);
            }
        }
        let n = outline.len();
        for i in 0..n {
            let a = &outline[i];
            let b = &outline[(i + 1) % n];
            if let Some(polygon) = Polygon3::new(vec![
                Vertex::new(bottom(a)),
                Vertex::new(bottom(b)),
                Vertex::new(top(b)),
                Vertex::new(top(a)),
            ]) {
                polygons.push(polygon);
            }
        }
        Solid::from_polygons(polygons)
    }
}

type Triangle = [(f64, f64); 3];

fn cross2(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Triangulates a CCW simple polygon by ear clipping.
///
/// Returns an empty list if the outline never yields a clippable ear
/// (self-intersecting input).
fn ear_clip(outline: &[(f64, f64)]) -> Vec<Triangle> {
    let mut remaining: Vec<(f64, f64)> = outline.to_vec();
    let mut triangles = Vec::new();
    'outer: while remaining.len() > 3 {
        let n = remaining.len();
        for i in 0..n {
            let prev = remaining[(i + n - 1) % n];
            let curr = remaining[i];
            let next = remaining[(i + 1) % n];
            // Convex corner of a CCW outline.
            if cross2(prev, curr, next) <= 0.0 {
                continue;
            }
            let blocked = remaining
                .iter()
                .filter(|&&v| v != prev && v != curr && v != next)
                .any(|&v| point_in_triangle(v, prev, curr, next));
            if blocked {
                continue;
            }
            triangles.push([prev, curr, next]);
            remaining.remove(i);
            continue 'outer;
        }
        // No ear found: degenerate or self-intersecting outline.
        return Vec::new();
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}
