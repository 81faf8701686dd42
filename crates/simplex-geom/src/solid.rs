use crate::{
    csg::{self, Polygon3, Vertex},
    stl,
    vec3::Vec3,
};

/// Axis-aligned bounding box of a solid: minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

/// An immutable handle to a 3D solid.
///
/// Internally a soup of planar convex polygons. Every operation returns a
/// fresh handle; the inputs are never modified, so handles can be shared
/// freely by the interpreter.
#[derive(Debug, Clone)]
pub struct Solid {
    polygons: Vec<Polygon3>,
}

impl Solid {
    pub(crate) fn from_polygons(polygons: Vec<Polygon3>) -> Self {
        Self { polygons }
    }

    /// A solid with no surface at all.
    ///
    /// Produced by intersecting disjoint solids; serializes to an STL with
    /// zero facets.
    #[must_use]
    pub fn empty() -> Self {
        Self { polygons: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Number of (possibly non-triangular) faces. Exposed for tests.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.polygons.len()
    }

    /// Boolean union with `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        Self::from_polygons(csg::union(&self.polygons, &other.polygons))
    }

    /// Boolean intersection with `other`.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Self::from_polygons(csg::intersect(&self.polygons, &other.polygons))
    }

    /// Boolean difference: the parts of `self` outside `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }
        Self::from_polygons(csg::difference(&self.polygons, &other.polygons))
    }

    /// Translation by `(dx, dy, dz)`.
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64, dz: f64) -> Self {
        let delta = Vec3::new(dx, dy, dz);
        self.map_vertices(|p| p + delta, false)
    }

    /// Rotation by Euler angles in degrees, applied in X, Y, Z order about
    /// the origin.
    #[must_use]
    pub fn rotate_deg(&self, rx: f64, ry: f64, rz: f64) -> Self {
        let (sx, cx) = rx.to_radians().sin_cos();
        let (sy, cy) = ry.to_radians().sin_cos();
        let (sz, cz) = rz.to_radians().sin_cos();
        self.map_vertices(
            move |p| {
                // X axis
                let p = Vec3::new(p.x, p.y * cx - p.z * sx, p.y * sx + p.z * cx);
                // Y axis
                let p = Vec3::new(p.x * cy + p.z * sy, p.y, -p.x * sy + p.z * cy);
                // Z axis
                Vec3::new(p.x * cz - p.y * sz, p.x * sz + p.y * cz, p.z)
            },
            false,
        )
    }

    /// Non-uniform scale about the origin.
    ///
    /// A negative scale factor mirrors the solid; an odd number of negative
    /// factors flips the winding, which is corrected so faces keep pointing
    /// outward.
    #[must_use]
    pub fn scale(&self, sx: f64, sy: f64, sz: f64) -> Self {
        let mirrored = sx * sy * sz < 0.0;
        self.map_vertices(move |p| Vec3::new(p.x * sx, p.y * sy, p.z * sz), mirrored)
    }

    /// Axis-aligned bounding box, or `None` for the empty solid.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let mut vertices = self.polygons.iter().flat_map(|p| p.vertices.iter());
        let first = vertices.next()?.pos;
        let (min, max) = vertices.fold((first, first), |(min, max), v| (min.min(v.pos), max.max(v.pos)));
        Some(Bounds { min, max })
    }

    /// Serializes the solid as newline-delimited ASCII STL.
    #[must_use]
    pub fn to_stl(&self, name: &str) -> String {
        stl::write_ascii(name, &self.polygons)
    }

    /// Applies `f` to every vertex and rebuilds planes from the transformed
    /// geometry. Polygons degenerated by the transform (e.g. scale by zero)
    /// are dropped.
    fn map_vertices(&self, f: impl Fn(Vec3) -> Vec3, reverse_winding: bool) -> Self {
        let polygons = self
            .polygons
            .iter()
            .filter_map(|polygon| {
                let mut vertices: Vec<Vertex> = polygon.vertices.iter().map(|v| Vertex::new(f(v.pos))).collect();
                if reverse_winding {
                    vertices.reverse();
                }
                Polygon3::new(vertices)
            })
            .collect();
        Self::from_polygons(polygons)
    }
}
