//! Unbalanced binary search tree over scheduled flights.
//!
//! Every node owns its flight and its two children. The ordering key is the
//! [`ScheduleKey`] of the flight, and the same key is used to insert, find and
//! remove, so traversal order and lookup order always agree. The tree is never
//! rebalanced; monotonic input degrades it to a list, which is fine for the
//! handful of flights a schedule holds.
//!
//! Insert and lookups walk the tree in a loop. Removal, [`ScheduleTree::height`]
//! and dropping the tree recurse once per level, so a degenerate tree of many
//! thousands of flights can exhaust the stack.

use std::cmp::Ordering;

use super::{Flight, ScheduleKey};

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    flight: Flight,
    left: Link,
    right: Link,
}

impl Node {
    fn new(flight: Flight) -> Self {
        Self {
            flight,
            left: None,
            right: None,
        }
    }

    fn key(&self) -> ScheduleKey {
        self.flight.schedule_key()
    }
}

/// Binary search tree of flights ordered by schedule key.
#[derive(Debug, Default)]
pub(crate) struct ScheduleTree {
    root: Link,
    len: usize,
}

impl ScheduleTree {
    /// Insert a flight, handing it back if its key is already taken.
    pub(crate) fn insert(&mut self, flight: Flight) -> Result<(), Flight> {
        let key = flight.schedule_key();
        let mut link = &mut self.root;
        while let Some(node) = link {
            link = match key.cmp(&node.key()) {
                Ordering::Less => &mut node.left,
                Ordering::Greater => &mut node.right,
                Ordering::Equal => return Err(flight),
            };
        }
        *link = Some(Box::new(Node::new(flight)));
        self.len += 1;
        Ok(())
    }

    pub(crate) fn get(&self, key: &ScheduleKey) -> Option<&Flight> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match key.cmp(&node.key()) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.flight),
            };
        }
        None
    }

    /// Mutable access to a flight.
    ///
    /// Callers must not change the date, time or id through this reference;
    /// those make up the key and the node would end up out of order.
    pub(crate) fn get_mut(&mut self, key: &ScheduleKey) -> Option<&mut Flight> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match key.cmp(&node.key()) {
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut node.flight),
            }
        }
        None
    }

    pub(crate) fn remove(&mut self, key: &ScheduleKey) -> Option<Flight> {
        let removed = Self::remove_from(&mut self.root, key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_from(link: &mut Link, key: &ScheduleKey) -> Option<Flight> {
        let node = link.as_mut()?;
        match key.cmp(&node.key()) {
            Ordering::Less => Self::remove_from(&mut node.left, key),
            Ordering::Greater => Self::remove_from(&mut node.right, key),
            Ordering::Equal => {
                let mut node = link.take()?;
                *link = match (node.left.take(), node.right.take()) {
                    (None, None) => None,
                    (Some(child), None) | (None, Some(child)) => Some(child),
                    (Some(left), Some(right)) => {
                        // Replace with the in-order successor.
                        let (mut successor, rest) = Self::split_min(right);
                        successor.left = Some(left);
                        successor.right = rest;
                        Some(successor)
                    }
                };
                Some(node.flight)
            }
        }
    }

    /// Detach the minimum node of a subtree, returning it and what remains.
    fn split_min(mut node: Box<Node>) -> (Box<Node>, Link) {
        match node.left.take() {
            None => {
                let rest = node.right.take();
                (node, rest)
            }
            Some(left) => {
                let (min, rest) = Self::split_min(left);
                node.left = rest;
                (min, Some(node))
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub(crate) fn height(&self) -> usize {
        fn height_of(link: &Link) -> usize {
            link.as_ref()
                .map_or(0, |node| 1 + height_of(&node.left).max(height_of(&node.right)))
        }
        height_of(&self.root)
    }

    pub(crate) fn iter(&self) -> InOrder<'_> {
        let mut iter = InOrder { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }
}

/// In-order iterator over the tree.
#[derive(Debug)]
pub struct InOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> InOrder<'a> {
    fn push_left(&mut self, mut current: Option<&'a Node>) {
        while let Some(node) = current {
            self.stack.push(node);
            current = node.left.as_deref();
        }
    }
}

impl<'a> Iterator for InOrder<'a> {
    type Item = &'a Flight;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(&node.flight)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;

    use super::*;
    use crate::flights::FlightId;

    fn flight(id: u32, time: &str) -> Flight {
        Flight {
            id: FlightId(id),
            origin: "Lahore".to_string(),
            destination: "Karachi".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            fare: Decimal::new(1000, 0),
            available_seats: 10,
        }
    }

    fn ids(tree: &ScheduleTree) -> Vec<u32> {
        tree.iter().map(|f| f.id.0).collect()
    }

    fn tree_of(flights: Vec<Flight>) -> ScheduleTree {
        let mut tree = ScheduleTree::default();
        for f in flights {
            tree.insert(f).unwrap();
        }
        tree
    }

    #[test]
    fn test_empty_tree() {
        let tree = ScheduleTree::default();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 0);
        assert!(tree.iter().next().is_none());
    }

    #[test]
    fn test_in_order_follows_time() {
        let tree = tree_of(vec![
            flight(1, "12:00"),
            flight(2, "16:00"),
            flight(3, "08:00"),
        ]);
        assert_eq!(ids(&tree), vec![3, 1, 2]);
    }

    #[test]
    fn test_duplicate_key_is_returned() {
        let mut tree = tree_of(vec![flight(1, "12:00")]);
        let rejected = tree.insert(flight(1, "12:00")).unwrap_err();
        assert_eq!(rejected.id, FlightId(1));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_same_time_ordered_by_id() {
        let tree = tree_of(vec![flight(2, "09:00"), flight(1, "09:00")]);
        assert_eq!(ids(&tree), vec![1, 2]);
    }

    #[test]
    fn test_monotonic_input_degenerates() {
        let tree = tree_of(vec![
            flight(1, "06:00"),
            flight(2, "07:00"),
            flight(3, "08:00"),
            flight(4, "09:00"),
        ]);
        assert_eq!(tree.height(), 4);
    }

    #[test]
    fn test_long_chain_remove_and_drop() {
        let mut tree = tree_of((1..=1000).map(|id| flight(id, "08:00")).collect());
        assert_eq!(tree.height(), 1000);

        let last = flight(1000, "08:00").schedule_key();
        assert_eq!(tree.remove(&last).unwrap().id, FlightId(1000));
        assert_eq!(tree.height(), 999);
        assert_eq!(tree.len(), 999);
        drop(tree);
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut tree = tree_of(vec![flight(1, "12:00"), flight(2, "08:00")]);
        let key = flight(2, "08:00").schedule_key();
        assert_eq!(tree.get(&key).map(|f| f.id), Some(FlightId(2)));

        tree.get_mut(&key).unwrap().available_seats = 3;
        assert_eq!(tree.get(&key).unwrap().available_seats, 3);

        let missing = flight(9, "23:00").schedule_key();
        assert!(tree.get(&missing).is_none());
        assert!(tree.get_mut(&missing).is_none());
    }

    #[test]
    fn test_remove_leaf() {
        let mut tree = tree_of(vec![flight(1, "12:00"), flight(2, "08:00")]);
        let removed = tree.remove(&flight(2, "08:00").schedule_key()).unwrap();
        assert_eq!(removed.id, FlightId(2));
        assert_eq!(ids(&tree), vec![1]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_node_with_one_child() {
        let mut tree = tree_of(vec![
            flight(1, "12:00"),
            flight(2, "08:00"),
            flight(3, "06:00"),
        ]);
        tree.remove(&flight(2, "08:00").schedule_key()).unwrap();
        assert_eq!(ids(&tree), vec![3, 1]);
    }

    #[test]
    fn test_remove_root_with_two_children() {
        let mut tree = tree_of(vec![
            flight(1, "12:00"),
            flight(2, "08:00"),
            flight(3, "16:00"),
            flight(4, "14:00"),
            flight(5, "15:00"),
            flight(6, "18:00"),
        ]);
        tree.remove(&flight(1, "12:00").schedule_key()).unwrap();
        assert_eq!(ids(&tree), vec![2, 4, 5, 3, 6]);
        assert_eq!(tree.len(), 5);

        let times: Vec<_> = tree.iter().map(|f| f.time).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_remove_missing_key() {
        let mut tree = tree_of(vec![flight(1, "12:00")]);
        assert!(tree.remove(&flight(2, "13:00").schedule_key()).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_everything() {
        let mut tree = tree_of(vec![
            flight(1, "12:00"),
            flight(2, "08:00"),
            flight(3, "16:00"),
        ]);
        for (id, time) in [(1, "12:00"), (3, "16:00"), (2, "08:00")] {
            assert!(tree.remove(&flight(id, time).schedule_key()).is_some());
        }
        assert_eq!(tree.len(), 0);
        assert!(tree.iter().next().is_none());
    }
}
