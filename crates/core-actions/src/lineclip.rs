//! Two-click line splitting: free, or forced onto 45/90 degree runs.
//!
//! With clipping active a rubber line from anchor to cursor becomes at most
//! two segments meeting at a 45 or 90 degree bend. The policy chooses which
//! half comes first; committing a segment with the swap-start-direction
//! board flag toggles the policy so successive traces alternate.

use core_geom::{Coord, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clipping {
    /// Lines run at any angle, unsplit.
    Free,
    /// Straight run first, diagonal second.
    #[default]
    OrthogonalFirst,
    /// Diagonal first, straight run second.
    AngledFirst,
}

impl Clipping {
    pub fn from_all_directions(all_directions: bool) -> Self {
        if all_directions {
            Clipping::Free
        } else {
            Clipping::OrthogonalFirst
        }
    }

    /// The swap applied after each committed segment when the board says
    /// so. Free stays free.
    pub fn swapped(self) -> Self {
        match self {
            Clipping::Free => Clipping::Free,
            Clipping::OrthogonalFirst => Clipping::AngledFirst,
            Clipping::AngledFirst => Clipping::OrthogonalFirst,
        }
    }
}

fn sign(v: Coord) -> Coord {
    match v.cmp(&0) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Split `from -> to` per the policy. Returns the bend point; `None` means
/// the run needs no bend (free clipping, a straight shot, or an exact
/// diagonal).
pub fn clip_line(from: Point, to: Point, clipping: Clipping) -> Option<Point> {
    if clipping == Clipping::Free || from == to {
        return None;
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let adx = dx.abs();
    let ady = dy.abs();
    if dx == 0 || dy == 0 || adx == ady {
        return None; // already a legal single segment
    }
    // The diagonal half covers min(adx, ady) on both axes; the straight
    // half covers the remainder along the dominant axis.
    let diag = adx.min(ady);
    let (run_x, run_y) = if adx > ady {
        (sign(dx) * (adx - diag), 0)
    } else {
        (0, sign(dy) * (ady - diag))
    };
    let bend = if clipping == Clipping::AngledFirst {
        Point::new(to.x - run_x, to.y - run_y)
    } else {
        Point::new(from.x + run_x, from.y + run_y)
    };
    Some(bend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_mode_never_bends() {
        assert_eq!(
            clip_line(Point::new(0, 0), Point::new(37, 91), Clipping::Free),
            None
        );
    }

    #[test]
    fn straight_and_diagonal_runs_stay_single() {
        let c = Clipping::OrthogonalFirst;
        assert_eq!(clip_line(Point::new(0, 0), Point::new(100, 0), c), None);
        assert_eq!(clip_line(Point::new(0, 0), Point::new(0, -40), c), None);
        assert_eq!(clip_line(Point::new(0, 0), Point::new(70, 70), c), None);
        assert_eq!(clip_line(Point::new(5, 5), Point::new(5, 5), c), None);
    }

    #[test]
    fn orthogonal_first_runs_straight_then_diagonal() {
        let bend = clip_line(
            Point::new(0, 0),
            Point::new(100, 40),
            Clipping::OrthogonalFirst,
        )
        .expect("bends");
        assert_eq!(bend, Point::new(60, 0));
        // Second half is an exact diagonal.
        assert_eq!((100 - bend.x).abs(), (40 - bend.y).abs());
    }

    #[test]
    fn angled_first_runs_diagonal_then_straight() {
        let bend = clip_line(
            Point::new(0, 0),
            Point::new(100, 40),
            Clipping::AngledFirst,
        )
        .expect("bends");
        assert_eq!(bend, Point::new(40, 40));
    }

    #[test]
    fn negative_quadrants() {
        let bend = clip_line(
            Point::new(0, 0),
            Point::new(-100, 40),
            Clipping::OrthogonalFirst,
        )
        .expect("bends");
        assert_eq!(bend, Point::new(-60, 0));
        let bend = clip_line(
            Point::new(0, 0),
            Point::new(30, -90),
            Clipping::OrthogonalFirst,
        )
        .expect("bends");
        assert_eq!(bend, Point::new(0, -60));
    }

    #[test]
    fn swap_toggles_between_split_policies() {
        assert_eq!(Clipping::OrthogonalFirst.swapped(), Clipping::AngledFirst);
        assert_eq!(Clipping::AngledFirst.swapped(), Clipping::OrthogonalFirst);
        assert_eq!(Clipping::Free.swapped(), Clipping::Free);
    }
}
