//! Bounding-box R-tree used as the board's spatial index.
//!
//! One tree exists per layer per entity kind (plus board-level trees for
//! vias, pins, pads and rats). Entries are `(BoxType, T)` pairs where `T` is
//! a small copyable identity; the tree never owns entities.
//!
//! Query semantics:
//! * an empty tree is valid and yields no hits;
//! * degenerate (point) boxes are legal entries;
//! * two entries with identical boxes coexist;
//! * among entries whose boxes tie exactly, visit order is unspecified and
//!   depends on insertion history.

use core_geom::BoxType;
use smallvec::SmallVec;

/// Maximum entries per node before a split.
const MAX_FILL: usize = 8;
/// Minimum entries a split half must receive.
const MIN_FILL: usize = 3;

/// Flow control returned by search callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchControl {
    /// Keep visiting.
    Continue,
    /// Abort the whole search now.
    Stop,
    /// From a subtree callback: do not descend into this subtree.
    SkipSubtree,
}

#[derive(Debug, Clone)]
enum Node<T> {
    Leaf(SmallVec<[(BoxType, T); MAX_FILL]>),
    Inner(SmallVec<[(BoxType, Box<Node<T>>); MAX_FILL]>),
}

impl<T> Node<T> {
    fn bbox(&self) -> BoxType {
        let mut b = BoxType::empty();
        match self {
            Node::Leaf(entries) => {
                for (eb, _) in entries {
                    b = b.union(eb);
                }
            }
            Node::Inner(children) => {
                for (cb, _) in children {
                    b = b.union(cb);
                }
            }
        }
        b
    }
}

/// The R-tree proper.
#[derive(Debug, Clone)]
pub struct Rtree<T> {
    root: Node<T>,
    len: usize,
}

impl<T: Copy + PartialEq> Default for Rtree<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn enlargement(host: &BoxType, add: &BoxType) -> i64 {
    host.union(add).area() - host.area()
}

impl<T: Copy + PartialEq> Rtree<T> {
    pub fn new() -> Self {
        Self {
            root: Node::Leaf(SmallVec::new()),
            len: 0,
        }
    }

    /// Bulk build. Entries are tiled by position first so the initial tree
    /// has sane overlap; later mutations are incremental.
    pub fn from_entries(mut entries: Vec<(BoxType, T)>) -> Self {
        entries.sort_by_key(|(b, _)| (b.x1, b.y1));
        let mut tree = Self::new();
        for (b, t) in entries {
            tree.insert(b, t);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert one entry. Identical boxes may repeat; each insert adds a
    /// distinct entry.
    pub fn insert(&mut self, bbox: BoxType, item: T) {
        self.len += 1;
        if let Some((b1, n1, b2, n2)) = Self::insert_node(&mut self.root, bbox, item) {
            // Root split: grow a level.
            let mut children = SmallVec::new();
            children.push((b1, Box::new(n1)));
            children.push((b2, Box::new(n2)));
            self.root = Node::Inner(children);
        }
    }

    /// Returns the two halves when the node overflowed and split.
    fn insert_node(node: &mut Node<T>, bbox: BoxType, item: T) -> Option<(BoxType, Node<T>, BoxType, Node<T>)> {
        match node {
            Node::Leaf(entries) => {
                entries.push((bbox, item));
                if entries.len() <= MAX_FILL {
                    return None;
                }
                let (left, right) = quadratic_split(std::mem::take(entries).into_vec());
                let lb = boxes_union(left.iter().map(|(b, _)| b));
                let rb = boxes_union(right.iter().map(|(b, _)| b));
                Some((
                    lb,
                    Node::Leaf(SmallVec::from_vec(left)),
                    rb,
                    Node::Leaf(SmallVec::from_vec(right)),
                ))
            }
            Node::Inner(children) => {
                // Least-enlargement child, area as tie breaker.
                let idx = children
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, (cb, _))| (enlargement(cb, &bbox), cb.area()))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let split = {
                    let (cb, child) = &mut children[idx];
                    *cb = cb.union(&bbox);
                    Self::insert_node(child, bbox, item)
                };
                if let Some((b1, n1, b2, n2)) = split {
                    children[idx] = (b1, Box::new(n1));
                    children.push((b2, Box::new(n2)));
                    if children.len() > MAX_FILL {
                        let (left, right) = quadratic_split(std::mem::take(children).into_vec());
                        let lb = boxes_union(left.iter().map(|(b, _)| b));
                        let rb = boxes_union(right.iter().map(|(b, _)| b));
                        return Some((
                            lb,
                            Node::Inner(SmallVec::from_vec(left)),
                            rb,
                            Node::Inner(SmallVec::from_vec(right)),
                        ));
                    }
                }
                None
            }
        }
    }

    /// Remove the entry carrying `item` under `bbox`. Returns whether an
    /// entry was removed. When duplicates exist (same box, same item) one
    /// arbitrary one goes.
    pub fn delete(&mut self, bbox: BoxType, item: T) -> bool {
        let mut orphans: Vec<(BoxType, T)> = Vec::new();
        let removed = Self::delete_node(&mut self.root, &bbox, &item, &mut orphans);
        if removed {
            self.len -= 1;
            // Collapse a root with a single inner child.
            loop {
                let replace = match &mut self.root {
                    Node::Inner(children) if children.len() == 1 => {
                        children.pop().map(|(_, child)| *child)
                    }
                    _ => None,
                };
                match replace {
                    Some(n) => self.root = n,
                    None => break,
                }
            }
            for (b, t) in orphans {
                self.len -= 1; // re-insert bumps it back
                self.insert(b, t);
            }
        }
        removed
    }

    fn delete_node(
        node: &mut Node<T>,
        bbox: &BoxType,
        item: &T,
        orphans: &mut Vec<(BoxType, T)>,
    ) -> bool {
        match node {
            Node::Leaf(entries) => {
                if let Some(pos) = entries.iter().position(|(b, t)| b == bbox && t == item) {
                    entries.remove(pos);
                    true
                } else {
                    false
                }
            }
            Node::Inner(children) => {
                for i in 0..children.len() {
                    if !children[i].0.touches(bbox) {
                        continue;
                    }
                    if Self::delete_node(&mut children[i].1, bbox, item, orphans) {
                        let underfull = match children[i].1.as_ref() {
                            Node::Leaf(e) => e.len() < MIN_FILL,
                            Node::Inner(c) => c.len() < MIN_FILL,
                        };
                        if underfull {
                            // Dissolve the child; its entries re-insert at
                            // the top.
                            let (_, child) = children.remove(i);
                            collect_entries(*child, orphans);
                        } else {
                            children[i].0 = children[i].1.bbox();
                        }
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Visit every entry whose box overlaps `region` (closed-interval
    /// comparison, so shared edges hit). The callback's return steers the
    /// walk; `SkipSubtree` from the optional `subtree` callback prunes whole
    /// nodes.
    pub fn search_with<F, G>(&self, region: &BoxType, mut subtree: G, mut found: F) -> usize
    where
        F: FnMut(&BoxType, T) -> SearchControl,
        G: FnMut(&BoxType) -> SearchControl,
    {
        let mut hits = 0;
        Self::search_node(&self.root, region, &mut subtree, &mut found, &mut hits);
        hits
    }

    /// Plain search: every overlapping entry, no subtree pruning. Returns
    /// the hit count.
    pub fn search<F>(&self, region: &BoxType, found: F) -> usize
    where
        F: FnMut(&BoxType, T) -> SearchControl,
    {
        self.search_with(region, |_| SearchControl::Continue, found)
    }

    fn search_node<F, G>(
        node: &Node<T>,
        region: &BoxType,
        subtree: &mut G,
        found: &mut F,
        hits: &mut usize,
    ) -> SearchControl
    where
        F: FnMut(&BoxType, T) -> SearchControl,
        G: FnMut(&BoxType) -> SearchControl,
    {
        match node {
            Node::Leaf(entries) => {
                for (b, t) in entries {
                    if b.touches(region) {
                        *hits += 1;
                        if found(b, *t) == SearchControl::Stop {
                            return SearchControl::Stop;
                        }
                    }
                }
            }
            Node::Inner(children) => {
                for (cb, child) in children {
                    if !cb.touches(region) {
                        continue;
                    }
                    match subtree(cb) {
                        SearchControl::Stop => return SearchControl::Stop,
                        SearchControl::SkipSubtree => continue,
                        SearchControl::Continue => {}
                    }
                    if Self::search_node(child, region, subtree, found, hits)
                        == SearchControl::Stop
                    {
                        return SearchControl::Stop;
                    }
                }
            }
        }
        SearchControl::Continue
    }

    /// All entries overlapping `region`, collected. Convenience for callers
    /// that want the full hit list.
    pub fn query(&self, region: &BoxType) -> Vec<(BoxType, T)> {
        let mut out = Vec::new();
        self.search(region, |b, t| {
            out.push((*b, t));
            SearchControl::Continue
        });
        out
    }
}

fn boxes_union<'a, I: Iterator<Item = &'a BoxType>>(boxes: I) -> BoxType {
    let mut b = BoxType::empty();
    for x in boxes {
        b = b.union(x);
    }
    b
}

fn collect_entries<T>(node: Node<T>, out: &mut Vec<(BoxType, T)>) {
    match node {
        Node::Leaf(entries) => out.extend(entries),
        Node::Inner(children) => {
            for (_, c) in children {
                collect_entries(*c, out);
            }
        }
    }
}

/// Quadratic split: seed with the pair wasting the most area together, then
/// deal remaining entries to whichever side grows least.
fn quadratic_split<E: SplitEntry>(mut entries: Vec<E>) -> (Vec<E>, Vec<E>) {
    debug_assert!(entries.len() > MAX_FILL);
    let (mut s1, mut s2) = (0, 1);
    let mut worst = i64::MIN;
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let waste = entries[i].bbox().union(&entries[j].bbox()).area()
                - entries[i].bbox().area()
                - entries[j].bbox().area();
            if waste > worst {
                worst = waste;
                s1 = i;
                s2 = j;
            }
        }
    }
    // Remove the higher index first so the lower stays valid.
    let e2 = entries.remove(s2);
    let e1 = entries.remove(s1);
    let mut left = vec![e1];
    let mut right = vec![e2];
    let mut lb = left[0].bbox();
    let mut rb = right[0].bbox();
    for e in entries {
        let remaining = MIN_FILL as i64;
        // Force balance when one side would otherwise starve.
        if (left.len() as i64) + remaining >= (MAX_FILL as i64 + 1) {
            rb = rb.union(&e.bbox());
            right.push(e);
            continue;
        }
        if (right.len() as i64) + remaining >= (MAX_FILL as i64 + 1) {
            lb = lb.union(&e.bbox());
            left.push(e);
            continue;
        }
        if enlargement(&lb, &e.bbox()) <= enlargement(&rb, &e.bbox()) {
            lb = lb.union(&e.bbox());
            left.push(e);
        } else {
            rb = rb.union(&e.bbox());
            right.push(e);
        }
    }
    (left, right)
}

trait SplitEntry {
    fn bbox(&self) -> BoxType;
}

impl<T> SplitEntry for (BoxType, T) {
    fn bbox(&self) -> BoxType {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::{BoxType, Point};

    fn bx(x1: i32, y1: i32, x2: i32, y2: i32) -> BoxType {
        BoxType::new(x1, y1, x2, y2)
    }

    #[test]
    fn empty_tree_returns_no_hits() {
        let t: Rtree<u32> = Rtree::new();
        assert_eq!(t.query(&bx(-1000, -1000, 1000, 1000)), vec![]);
        assert!(t.is_empty());
    }

    #[test]
    fn insert_and_query() {
        let mut t = Rtree::new();
        t.insert(bx(0, 0, 10, 10), 1u32);
        t.insert(bx(20, 20, 30, 30), 2);
        let hits = t.query(&bx(5, 5, 25, 25));
        assert_eq!(hits.len(), 2);
        let only = t.query(&bx(0, 0, 4, 4));
        assert_eq!(only, vec![(bx(0, 0, 10, 10), 1)]);
    }

    #[test]
    fn duplicate_boxes_coexist() {
        let mut t = Rtree::new();
        t.insert(bx(0, 0, 10, 10), 1u32);
        t.insert(bx(0, 0, 10, 10), 2);
        assert_eq!(t.len(), 2);
        let mut seen: Vec<u32> = t.query(&bx(0, 0, 10, 10)).iter().map(|(_, v)| *v).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
        // Deleting one leaves the other.
        assert!(t.delete(bx(0, 0, 10, 10), 1));
        assert_eq!(t.query(&bx(0, 0, 10, 10)), vec![(bx(0, 0, 10, 10), 2)]);
    }

    #[test]
    fn point_entries_are_legal() {
        let mut t = Rtree::new();
        let pb = BoxType::point_box(Point::new(7, 7));
        t.insert(pb, 9u32);
        assert_eq!(t.query(&bx(7, 7, 8, 8)).len(), 1);
    }

    #[test]
    fn delete_missing_returns_false() {
        let mut t = Rtree::new();
        t.insert(bx(0, 0, 10, 10), 1u32);
        assert!(!t.delete(bx(0, 0, 10, 10), 2));
        assert!(!t.delete(bx(1, 1, 2, 2), 1));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn survives_many_inserts_and_deletes() {
        let mut t = Rtree::new();
        let mut boxes = Vec::new();
        for i in 0..200i32 {
            let b = bx(i * 10, (i % 17) * 10, i * 10 + 15, (i % 17) * 10 + 15);
            boxes.push((b, i));
            t.insert(b, i);
        }
        assert_eq!(t.len(), 200);
        // Everything is findable.
        for (b, i) in &boxes {
            assert!(t.query(b).iter().any(|(_, v)| v == i), "lost entry {i}");
        }
        // Delete every other entry and re-check.
        for (b, i) in boxes.iter().step_by(2) {
            assert!(t.delete(*b, *i));
        }
        assert_eq!(t.len(), 100);
        for (b, i) in &boxes {
            let found = t.query(b).iter().any(|(_, v)| v == i);
            assert_eq!(found, i % 2 == 1, "entry {i}");
        }
    }

    #[test]
    fn stop_short_circuits() {
        let mut t = Rtree::new();
        for i in 0..50i32 {
            t.insert(bx(i, 0, i + 1, 1), i);
        }
        let mut visited = 0;
        t.search(&bx(0, 0, 100, 100), |_, _| {
            visited += 1;
            if visited == 5 {
                SearchControl::Stop
            } else {
                SearchControl::Continue
            }
        });
        assert_eq!(visited, 5);
    }

    #[test]
    fn skip_subtree_prunes() {
        let mut t = Rtree::new();
        // Two well-separated clusters so they end in distinct subtrees.
        for i in 0..20i32 {
            t.insert(bx(i, i, i + 2, i + 2), i);
            t.insert(bx(100_000 + i, i, 100_000 + i + 2, i + 2), 1000 + i);
        }
        let mut hits = Vec::new();
        t.search_with(
            &bx(-10, -10, 200_000, 100),
            |nb| {
                if nb.x1 >= 50_000 {
                    SearchControl::SkipSubtree
                } else {
                    SearchControl::Continue
                }
            },
            |_, v| {
                hits.push(v);
                SearchControl::Continue
            },
        );
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|v| *v < 1000), "far cluster leaked through");
    }

    #[test]
    fn bulk_build_matches_incremental() {
        let entries: Vec<(BoxType, i32)> = (0..100)
            .map(|i| (bx(i * 7, i * 3, i * 7 + 5, i * 3 + 5), i))
            .collect();
        let bulk = Rtree::from_entries(entries.clone());
        assert_eq!(bulk.len(), 100);
        for (b, i) in &entries {
            assert!(bulk.query(b).iter().any(|(_, v)| v == i));
        }
    }
}
