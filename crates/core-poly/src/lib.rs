//! Contour algebra for polygon clearance.
//!
//! A [`PolyArea`] is a set of disjoint islands, each an outer ring with zero
//! or more holes. The boolean engine ([`boolean`]) subtracts, unions and
//! intersects areas on the integer grid; [`shapes`] builds the clearance
//! outlines conductors cast (stroked lines, rings, octagons, squares) and
//! the thermal spoke geometry that bridges a clearance ring.
//!
//! Everything here is pure: callers gather the conductors that overlap a
//! polygon and feed their outlines through [`PolyArea::subtract`]; the board
//! model owns when that happens.

use core_geom::{BoxType, Point, contour::point_in_contour, contour_area2};
use thiserror::Error;

pub mod boolean;
pub mod shapes;

pub use shapes::{
    PinShape, ThermalSpokes, arc_clearance_outline, circle_outline, line_clearance_outline,
    octagon_outline, pin_clearance_outline, square_outline, thermal_clearance,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("contour needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("contour is degenerate (zero area)")]
    Degenerate,
}

/// A closed ring of grid points. Stored without the closing repeat; winding
/// is normalized by the constructors (outers counter-clockwise, holes
/// clockwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Result<Self, PolyError> {
        if points.len() < 3 {
            return Err(PolyError::TooFewPoints(points.len()));
        }
        if contour_area2(&points) == 0 {
            return Err(PolyError::Degenerate);
        }
        Ok(Self { points })
    }

    /// Twice the signed area.
    pub fn area2(&self) -> i128 {
        contour_area2(&self.points)
    }

    /// Absolute area as f64 (may exceed integer range for board-sized
    /// rings).
    pub fn area(&self) -> f64 {
        (self.area2().abs() as f64) / 2.0
    }

    pub fn bbox(&self) -> BoxType {
        let mut b = BoxType::empty();
        for p in &self.points {
            b = b.union(&BoxType::point_box(*p));
        }
        b
    }

    pub fn contains(&self, p: Point) -> bool {
        point_in_contour(p, &self.points)
    }

    fn reversed(mut self) -> Self {
        self.points.reverse();
        self
    }

    /// Force counter-clockwise winding.
    pub fn ccw(self) -> Self {
        if self.area2() < 0 { self.reversed() } else { self }
    }

    /// Force clockwise winding.
    pub fn cw(self) -> Self {
        if self.area2() > 0 { self.reversed() } else { self }
    }
}

/// One connected region: an outer ring and its holes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

impl Island {
    pub fn new(outer: Contour) -> Self {
        Self {
            outer: outer.ccw(),
            holes: Vec::new(),
        }
    }

    pub fn bbox(&self) -> BoxType {
        self.outer.bbox()
    }

    pub fn area(&self) -> f64 {
        let mut a = self.outer.area();
        for h in &self.holes {
            a -= h.area();
        }
        a
    }

    pub fn contains(&self, p: Point) -> bool {
        if !self.outer.contains(p) {
            return false;
        }
        // A point on a hole's rim still belongs to the copper.
        for h in &self.holes {
            if h.contains(p) && !on_ring(p, &h.points) {
                return false;
            }
        }
        true
    }
}

fn on_ring(p: Point, ring: &[Point]) -> bool {
    let n = ring.len();
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if core_geom::point_segment_distance(p, a, b) == 0.0 {
            return true;
        }
    }
    false
}

/// A set of disjoint islands. The empty area is a valid value (a polygon
/// entirely eaten by clearances).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolyArea {
    pub islands: Vec<Island>,
}

impl PolyArea {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_island(island: Island) -> Self {
        Self {
            islands: vec![island],
        }
    }

    /// Build from an outer ring alone.
    pub fn from_contour(points: Vec<Point>) -> Result<Self, PolyError> {
        Ok(Self::from_island(Island::new(Contour::new(points)?)))
    }

    /// Build from a point list partitioned by hole start indices, the way a
    /// board polygon stores its contours.
    pub fn from_contours(points: &[Point], hole_indices: &[usize]) -> Result<Self, PolyError> {
        let first_hole = hole_indices.first().copied().unwrap_or(points.len());
        let mut island = Island::new(Contour::new(points[..first_hole].to_vec())?);
        for (i, &start) in hole_indices.iter().enumerate() {
            let end = hole_indices.get(i + 1).copied().unwrap_or(points.len());
            island.holes.push(Contour::new(points[start..end].to_vec())?.cw());
        }
        Ok(Self::from_island(island))
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn bbox(&self) -> BoxType {
        let mut b = BoxType::empty();
        for i in &self.islands {
            b = b.union(&i.bbox());
        }
        b
    }

    pub fn area(&self) -> f64 {
        self.islands.iter().map(Island::area).sum()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.islands.iter().any(|i| i.contains(p))
    }

    /// Total hole count across islands.
    pub fn hole_count(&self) -> usize {
        self.islands.iter().map(|i| i.holes.len()).sum()
    }

    pub fn subtract(&self, other: &PolyArea) -> PolyArea {
        boolean::boolean(self, other, boolean::BoolOp::Difference)
    }

    pub fn union(&self, other: &PolyArea) -> PolyArea {
        boolean::boolean(self, other, boolean::BoolOp::Union)
    }

    pub fn intersect(&self, other: &PolyArea) -> PolyArea {
        boolean::boolean(self, other, boolean::BoolOp::Intersection)
    }

    /// Keep only the island with the largest area. The clipped shape of a
    /// polygon without FULLPOLY retains just this one.
    pub fn largest_island(&self) -> PolyArea {
        let best = self
            .islands
            .iter()
            .max_by(|a, b| a.area().total_cmp(&b.area()));
        match best {
            Some(island) => PolyArea::from_island(island.clone()),
            None => PolyArea::empty(),
        }
    }

    /// Split into one area per island, dropping islands below `min_area`.
    /// This is the geometry behind polygon morphing.
    pub fn split_islands(&self, min_area: f64) -> Vec<PolyArea> {
        self.islands
            .iter()
            .filter(|i| i.area() >= min_area)
            .map(|i| PolyArea::from_island(i.clone()))
            .collect()
    }
}
