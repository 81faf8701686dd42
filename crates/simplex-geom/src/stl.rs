//! ASCII STL serialization.

use std::fmt::Write;

use crate::csg::Polygon3;

/// Formats a coordinate with seven fractional digits of scientific notation,
/// which guarantees at least seven significant digits round-trip.
fn fmt_coord(value: f64) -> String {
    format!("{value:.7e}")
}

/// Serializes polygons as newline-delimited ASCII STL.
///
/// Faces with more than three vertices are fan-triangulated; every facet
/// carries the unit normal of its source polygon's plane.
pub(crate) fn write_ascii(name: &str, polygons: &[Polygon3]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "solid {name}");
    for polygon in polygons {
        let n = polygon.plane.normal;
        for i in 1..polygon.vertices.len() - 1 {
            let _ = writeln!(
                out,
                "facet normal {} {} {}",
                fmt_coord(n.x),
                fmt_coord(n.y),
                fmt_coord(n.z)
            );
            let _ = writeln!(out, "  outer loop");
            for vertex in [
                polygon.vertices[0],
                polygon.vertices[i],
                polygon.vertices[i + 1],
            ] {
                let _ = writeln!(
                    out,
                    "    vertex {} {} {}",
                    fmt_coord(vertex.pos.x),
                    fmt_coord(vertex.pos.y),
                    fmt_coord(vertex.pos.z)
                );
            }
            let _ = writeln!(out, "  endloop");
            let _ = writeln!(out, "endfacet");
        }
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::primitives::cuboid;

    #[test]
    fn coord_has_seven_fraction_digits() {
        assert_eq!(fmt_coord(1.0), "1.0000000e0");
        assert_eq!(fmt_coord(-0.5), "-5.0000000e-1");
    }

    /// A cuboid has 6 quad faces, so 12 facets after fan triangulation.
    #[test]
    fn cuboid_stl_facet_count() {
        let stl = cuboid(1.0, 1.0, 1.0).to_stl("box");
        assert_eq!(stl.matches("facet normal").count(), 12);
        assert_eq!(stl.matches("vertex").count(), 36);
        assert!(stl.starts_with("solid box\n"));
        assert!(stl.ends_with("endsolid box\n"));
    }

    #[test]
    fn empty_solid_stl_has_no_facets() {
        let stl = crate::solid::Solid::empty().to_stl("nothing");
        assert_eq!(stl, "solid nothing\nendsolid nothing\n");
    }
}
