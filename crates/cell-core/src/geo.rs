//! Cartesian geometry for region coverage and geocast destination areas.
//!
//! Coordinates are metres in a local projected plane (`f64`).  Geographic
//! projection is the job of whoever produces the configuration; the kernel
//! only needs containment and intersection tests.

use crate::{CoreError, CoreResult};

// ── CartesianPoint ────────────────────────────────────────────────────────────

/// A point in the local projected plane, in metres.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
}

impl CartesianPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in metres.
    #[inline]
    pub fn distance_to(self, other: CartesianPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::fmt::Display for CartesianPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ── Polygon ───────────────────────────────────────────────────────────────────

/// A simple (non self-intersecting) polygon.  The closing edge from the last
/// vertex back to the first is implicit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub vertices: Vec<CartesianPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<CartesianPoint>) -> CoreResult<Self> {
        let polygon = Self { vertices };
        polygon.validate()?;
        Ok(polygon)
    }

    /// Axis-aligned rectangle spanned by two opposite corners.
    pub fn rectangle(a: CartesianPoint, b: CartesianPoint) -> Self {
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        Self {
            vertices: vec![
                CartesianPoint::new(min_x, min_y),
                CartesianPoint::new(max_x, min_y),
                CartesianPoint::new(max_x, max_y),
                CartesianPoint::new(min_x, max_y),
            ],
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.vertices.len() < 3 {
            return Err(CoreError::DegeneratePolygon(self.vertices.len()));
        }
        if let Some(p) = self.vertices.iter().find(|p| !p.is_finite()) {
            return Err(CoreError::NonFiniteCoordinate { x: p.x, y: p.y });
        }
        Ok(())
    }

    /// `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounding_box(&self) -> (CartesianPoint, CartesianPoint) {
        let mut min = CartesianPoint::new(f64::INFINITY, f64::INFINITY);
        let mut max = CartesianPoint::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.vertices {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Edges as `(start, end)` pairs, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (CartesianPoint, CartesianPoint)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Even-odd ray casting.  Points exactly on an edge may land either way.
    pub fn contains(&self, p: CartesianPoint) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// `true` if the two polygons overlap or touch.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.vertices.iter().any(|&v| other.contains(v))
            || other.vertices.iter().any(|&v| self.contains(v))
        {
            return true;
        }
        self.edges().any(|(a, b)| {
            other.edges().any(|(c, d)| segments_intersect(a, b, c, d))
        })
    }
}

// ── Area ──────────────────────────────────────────────────────────────────────

/// A geocast destination area or a region's coverage area.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum Area {
    Rectangle { a: CartesianPoint, b: CartesianPoint },
    Circle { center: CartesianPoint, radius: f64 },
    Polygon(Polygon),
}

impl Area {
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Area::Rectangle { a, b } => {
                for p in [a, b] {
                    if !p.is_finite() {
                        return Err(CoreError::NonFiniteCoordinate { x: p.x, y: p.y });
                    }
                }
                Ok(())
            }
            Area::Circle { center, radius } => {
                if !center.is_finite() {
                    return Err(CoreError::NonFiniteCoordinate { x: center.x, y: center.y });
                }
                if !(*radius > 0.0 && radius.is_finite()) {
                    return Err(CoreError::InvalidRadius(*radius));
                }
                Ok(())
            }
            Area::Polygon(polygon) => polygon.validate(),
        }
    }

    pub fn contains(&self, p: CartesianPoint) -> bool {
        match self {
            Area::Rectangle { a, b } => {
                p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x)
                    && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
            }
            Area::Circle { center, radius } => center.distance_to(p) <= *radius,
            Area::Polygon(polygon) => polygon.contains(p),
        }
    }

    /// `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounding_box(&self) -> (CartesianPoint, CartesianPoint) {
        match self {
            Area::Rectangle { a, b } => Polygon::rectangle(*a, *b).bounding_box(),
            Area::Circle { center, radius } => (
                CartesianPoint::new(center.x - radius, center.y - radius),
                CartesianPoint::new(center.x + radius, center.y + radius),
            ),
            Area::Polygon(polygon) => polygon.bounding_box(),
        }
    }

    /// `true` if this area overlaps the polygon `region`.
    pub fn intersects_polygon(&self, region: &Polygon) -> bool {
        match self {
            Area::Rectangle { a, b } => Polygon::rectangle(*a, *b).intersects(region),
            Area::Polygon(polygon) => polygon.intersects(region),
            Area::Circle { center, radius } => {
                if region.contains(*center) {
                    return true;
                }
                region
                    .edges()
                    .any(|(a, b)| segment_distance(*center, a, b) <= *radius)
            }
        }
    }
}

// ── Segment helpers ───────────────────────────────────────────────────────────

fn orientation(a: CartesianPoint, b: CartesianPoint, c: CartesianPoint) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: CartesianPoint, b: CartesianPoint, p: CartesianPoint) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(
    p1: CartesianPoint,
    p2: CartesianPoint,
    q1: CartesianPoint,
    q2: CartesianPoint,
) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Shortest distance from `p` to the segment `a`–`b`.
fn segment_distance(p: CartesianPoint, a: CartesianPoint, b: CartesianPoint) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_2 = dx * dx + dy * dy;
    if len_2 == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_2).clamp(0.0, 1.0);
    p.distance_to(CartesianPoint::new(a.x + t * dx, a.y + t * dy))
}
