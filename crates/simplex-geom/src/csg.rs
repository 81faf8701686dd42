//! BSP-tree boolean operations over polygon soups.
//!
//! This is the classic csg.js construction: each solid is a list of planar
//! convex polygons, booleans are computed by building a BSP tree per operand
//! and clipping each soup against the other. All three combinators preserve
//! the convexity of individual polygons, so results can be fed straight back
//! in as operands.

use crate::vec3::Vec3;

/// Tolerance below which a point is considered to lie on a plane.
pub(crate) const EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// A polygon corner. Only the position is carried; facet normals are
/// recomputed from the plane when serializing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Vertex {
    pub pos: Vec3,
}

impl Vertex {
    pub fn new(pos: Vec3) -> Self {
        Self { pos }
    }

    /// New vertex on the segment between `self` and `other` at parameter `t`.
    fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            pos: self.pos.lerp(other.pos, t),
        }
    }
}

/// An oriented plane in normal/offset form: `normal . p == w`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Plane {
    pub normal: Vec3,
    pub w: f64,
}

impl Plane {
    /// Plane through three points, or `None` if they are collinear.
    fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let normal = (b - a).cross(c - a);
        if normal.length() < EPSILON {
            return None;
        }
        let normal = normal.normalized();
        Some(Self {
            normal,
            w: normal.dot(a),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Splits `polygon` by this plane, distributing the pieces into the four
    /// output lists. Coplanar polygons go front or back depending on whether
    /// they face the same way as the plane.
    fn split_polygon(
        self,
        polygon: &Polygon3,
        coplanar_front: &mut Vec<Polygon3>,
        coplanar_back: &mut Vec<Polygon3>,
        front: &mut Vec<Polygon3>,
        back: &mut Vec<Polygon3>,
    ) {
        let mut polygon_type = COPLANAR;
        let mut types = Vec::with_capacity(polygon.vertices.len());
        for vertex in &polygon.vertices {
            let t = self.normal.dot(vertex.pos) - self.w;
            let vertex_type = if t < -EPSILON {
                BACK
            } else if t > EPSILON {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= vertex_type;
            types.push(vertex_type);
        }

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                let mut f = Vec::new();
                let mut b = Vec::new();
                let len = polygon.vertices.len();
                for i in 0..len {
                    let j = (i + 1) % len;
                    let ti = types[i];
                    let tj = types[j];
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];
                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(vi.pos)) / self.normal.dot(vj.pos - vi.pos);
                        let v = vi.interpolate(vj, t);
                        f.push(v);
                        b.push(v);
                    }
                }
                // Fragments inherit the parent plane: recomputing it from
                // near-collinear fragment vertices is numerically fragile.
                if f.len() >= 3 {
                    front.push(Polygon3::with_plane(f, polygon.plane));
                }
                if b.len() >= 3 {
                    back.push(Polygon3::with_plane(b, polygon.plane));
                }
            }
        }
    }
}

/// A planar convex polygon with at least three vertices.
#[derive(Debug, Clone)]
pub(crate) struct Polygon3 {
    pub vertices: Vec<Vertex>,
    pub plane: Plane,
}

impl Polygon3 {
    /// Builds a polygon, computing its plane from the first three vertices.
    ///
    /// Returns `None` for degenerate (collinear) vertex lists; callers drop
    /// such polygons instead of propagating broken planes into the tree.
    pub fn new(vertices: Vec<Vertex>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices[0].pos, vertices[1].pos, vertices[2].pos)?;
        Some(Self { vertices, plane })
    }

    fn with_plane(vertices: Vec<Vertex>, plane: Plane) -> Self {
        Self { vertices, plane }
    }

    /// Reverses the winding and the plane so the polygon faces the other way.
    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

/// One node of a BSP tree holding the polygons coplanar with its plane.
#[derive(Debug, Default)]
struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon3>,
}

impl Node {
    fn new(polygons: Vec<Polygon3>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Inserts polygons into the tree, splitting them across node planes.
    ///
    /// The first polygon's plane seeds a fresh node. No heuristics for plane
    /// selection; input order determines the tree shape.
    fn build(&mut self, polygons: Vec<Polygon3>) {
        if polygons.is_empty() {
            return;
        }
        if self.plane.is_none() {
            self.plane = Some(polygons[0].plane);
        }
        let plane = self.plane.expect("plane set above");
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in &polygons {
            // Coplanar polygons stay on this node either way.
            let mut coplanar_back = Vec::new();
            plane.split_polygon(polygon, &mut self.polygons, &mut coplanar_back, &mut front, &mut back);
            self.polygons.append(&mut coplanar_back);
        }
        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }

    /// Converts solid space to empty space and vice versa.
    fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Removes the parts of `polygons` inside this tree's solid.
    fn clip_polygons(&self, polygons: Vec<Polygon3>) -> Vec<Polygon3> {
        let Some(plane) = self.plane else {
            return polygons;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in &polygons {
            // Coplanar polygons are clipped with the side they face.
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            plane.split_polygon(polygon, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);
        }
        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            // No back child: back polygons are inside the solid and vanish.
            Some(node) => node.clip_polygons(back),
            None => Vec::new(),
        };
        front.extend(back);
        front
    }

    /// Clips every polygon stored in this tree against `bsp`.
    fn clip_to(&mut self, bsp: &Node) {
        self.polygons = bsp.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(bsp);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(bsp);
        }
    }

    /// Collects every polygon in the tree.
    fn all_polygons(&self) -> Vec<Polygon3> {
        let mut out = self.polygons.clone();
        if let Some(front) = &self.front {
            out.extend(front.all_polygons());
        }
        if let Some(back) = &self.back {
            out.extend(back.all_polygons());
        }
        out
    }
}

/// Boolean union of two polygon soups.
pub(crate) fn union(a: &[Polygon3], b: &[Polygon3]) -> Vec<Polygon3> {
    let mut a = Node::new(a.to_vec());
    let mut b = Node::new(b.to_vec());
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}

/// Boolean difference `a - b`.
pub(crate) fn difference(a: &[Polygon3], b: &[Polygon3]) -> Vec<Polygon3> {
    let mut a = Node::new(a.to_vec());
    let mut b = Node::new(b.to_vec());
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

/// Boolean intersection of two polygon soups.
pub(crate) fn intersect(a: &[Polygon3], b: &[Polygon3]) -> Vec<Polygon3> {
    let mut a = Node::new(a.to_vec());
    let mut b = Node::new(b.to_vec());
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}
