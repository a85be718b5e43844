// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geometry utilities: geodesic buffering, centroids and regional
//! classification.
//!
//! Buffering approximates a geodesic outward expansion by unioning
//! per-vertex circles and per-segment capsules built from haversine
//! destination points. Precision follows the upstream GeoJSON coordinate
//! resolution; nothing finer is claimed.

use geo::{
    BooleanOps, Centroid, Coord, Geometry, GeometryCollection, HaversineBearing,
    HaversineDestination, HaversineLength, LineString, MultiPolygon, Point, Polygon,
};

use crate::models::RunConvention;

/// Number of points used to approximate a buffer circle.
const CIRCLE_STEPS: usize = 16;

/// Expand a geometry outward by `km`, returning a Polygon or MultiPolygon.
///
/// Returns `None` when the input is degenerate: a non-positive distance, or
/// no finite coordinates to expand from.
pub fn buffer(geometry: &Geometry<f64>, km: f64) -> Option<Geometry<f64>> {
    if km <= 0.0 {
        return None;
    }
    let meters = km * 1000.0;

    let vertices = vertices_of(geometry);
    if vertices.is_empty() {
        return None;
    }

    let mut pieces: Vec<Polygon<f64>> = Vec::new();
    for vertex in &vertices {
        pieces.push(circle_polygon(Point::from(*vertex), meters));
    }
    for (a, b) in segments_of(geometry) {
        if a != b {
            pieces.push(segment_capsule(Point::from(a), Point::from(b), meters));
        }
    }
    // Polygon inputs contribute their own interior to the union
    match geometry {
        Geometry::Polygon(p) => pieces.push(p.clone()),
        Geometry::MultiPolygon(mp) => pieces.extend(mp.0.iter().cloned()),
        _ => {}
    }

    let mut remaining = pieces.into_iter();
    let first = remaining.next()?;
    let mut union = MultiPolygon::new(vec![first]);
    for piece in remaining {
        union = union.union(&MultiPolygon::new(vec![piece]));
    }

    match union.0.len() {
        0 => None,
        1 => union.0.into_iter().next().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(union)),
    }
}

/// Centroid of a heterogeneous set of geometries.
pub fn centroid<I>(geometries: I) -> Option<Point<f64>>
where
    I: IntoIterator<Item = Geometry<f64>>,
{
    GeometryCollection(geometries.into_iter().collect()).centroid()
}

/// Centroid of a single geometry.
pub fn centroid_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    geometry.centroid()
}

/// Combined length of a geometry's line strings, in kilometres.
///
/// Points and polygons contribute no length.
pub fn geometry_length_km(geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::LineString(line) => line.haversine_length() / 1000.0,
        Geometry::MultiLineString(lines) => lines.haversine_length() / 1000.0,
        _ => 0.0,
    }
}

/// Regional run-difficulty colour convention for a position.
///
/// Pure function of the coordinates: rough bounding boxes for Japan and
/// Europe, everything else reads as North American.
pub fn run_convention(point: &Point<f64>) -> RunConvention {
    let (lon, lat) = (point.x(), point.y());
    if (122.0..=154.0).contains(&lon) && (24.0..=46.0).contains(&lat) {
        RunConvention::Japan
    } else if (-26.0..=65.0).contains(&lon) && (34.0..=72.0).contains(&lat) {
        RunConvention::Europe
    } else {
        RunConvention::NorthAmerica
    }
}

/// All finite coordinates of a geometry.
fn vertices_of(geometry: &Geometry<f64>) -> Vec<Coord<f64>> {
    let mut coords = Vec::new();
    collect_vertices(geometry, &mut coords);
    coords
        .into_iter()
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .collect()
}

fn collect_vertices(geometry: &Geometry<f64>, out: &mut Vec<Coord<f64>>) {
    match geometry {
        Geometry::Point(p) => out.push(p.0),
        Geometry::MultiPoint(mp) => out.extend(mp.0.iter().map(|p| p.0)),
        Geometry::LineString(line) => out.extend(line.0.iter().copied()),
        Geometry::MultiLineString(lines) => {
            for line in &lines.0 {
                out.extend(line.0.iter().copied());
            }
        }
        Geometry::Polygon(poly) => polygon_vertices(poly, out),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                polygon_vertices(poly, out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_vertices(g, out);
            }
        }
        _ => {}
    }
}

fn polygon_vertices(poly: &Polygon<f64>, out: &mut Vec<Coord<f64>>) {
    out.extend(poly.exterior().0.iter().copied());
    for ring in poly.interiors() {
        out.extend(ring.0.iter().copied());
    }
}

/// All line segments of a geometry (polygon rings included).
fn segments_of(geometry: &Geometry<f64>) -> Vec<(Coord<f64>, Coord<f64>)> {
    let mut segments = Vec::new();
    collect_segments(geometry, &mut segments);
    segments
        .into_iter()
        .filter(|(a, b)| {
            a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()
        })
        .collect()
}

fn collect_segments(geometry: &Geometry<f64>, out: &mut Vec<(Coord<f64>, Coord<f64>)>) {
    match geometry {
        Geometry::LineString(line) => ring_segments(line, out),
        Geometry::MultiLineString(lines) => {
            for line in &lines.0 {
                ring_segments(line, out);
            }
        }
        Geometry::Polygon(poly) => polygon_segments(poly, out),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                polygon_segments(poly, out);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_segments(g, out);
            }
        }
        _ => {}
    }
}

fn polygon_segments(poly: &Polygon<f64>, out: &mut Vec<(Coord<f64>, Coord<f64>)>) {
    ring_segments(poly.exterior(), out);
    for ring in poly.interiors() {
        ring_segments(ring, out);
    }
}

fn ring_segments(line: &LineString<f64>, out: &mut Vec<(Coord<f64>, Coord<f64>)>) {
    out.extend(line.0.windows(2).map(|w| (w[0], w[1])));
}

/// Circle approximation around a point, radius in meters.
fn circle_polygon(center: Point<f64>, radius_m: f64) -> Polygon<f64> {
    let mut coords: Vec<Coord<f64>> = (0..CIRCLE_STEPS)
        .map(|i| {
            let bearing = i as f64 * (360.0 / CIRCLE_STEPS as f64);
            center.haversine_destination(bearing, radius_m).0
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

/// Rectangle covering a segment offset by `width_m` to each side.
///
/// End caps come from the vertex circles, so the capsule itself is a quad.
fn segment_capsule(a: Point<f64>, b: Point<f64>, width_m: f64) -> Polygon<f64> {
    let bearing = a.haversine_bearing(b);
    let left = bearing - 90.0;
    let right = bearing + 90.0;
    let coords = vec![
        a.haversine_destination(left, width_m).0,
        b.haversine_destination(left, width_m).0,
        b.haversine_destination(right, width_m).0,
        a.haversine_destination(right, width_m).0,
        a.haversine_destination(left, width_m).0,
    ];
    Polygon::new(LineString::new(coords), vec![])
}
