//! Position arithmetic over item vectors. Every function that changes membership or
//! positions leaves `order` equal to each item's index.

use super::item::{ContentItem, Direction};

/// Stable sort by the stored `order` field.
pub fn sort_by_order<P>(items: &mut [ContentItem<P>]) {
    items.sort_by_key(|it| it.order);
}

/// Reassign `order` to the positional index.
pub fn renumber<P>(items: &mut [ContentItem<P>]) {
    for (i, it) in items.iter_mut().enumerate() {
        it.order = i;
    }
}

/// True when the `order` values are exactly `0..len`, each once.
pub fn is_dense<P>(items: &[ContentItem<P>]) -> bool {
    let mut seen = vec![false; items.len()];
    for it in items {
        match seen.get_mut(it.order) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

pub fn position<P>(items: &[ContentItem<P>], id: &str) -> Option<usize> {
    items.iter().position(|it| it.id == id)
}

/// Swap the item at `index` with its neighbour. Returns false at the boundary.
pub fn step<P>(items: &mut [ContentItem<P>], index: usize, direction: Direction) -> bool {
    let target = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|t| *t < items.len()),
    };
    let Some(target) = target else { return false; };
    if index >= items.len() { return false; }
    items.swap(index, target);
    renumber(items);
    true
}

/// Remove the item at `index` and close the gap.
pub fn remove_at<P>(items: &mut Vec<ContentItem<P>>, index: usize) -> ContentItem<P> {
    let removed = items.remove(index);
    renumber(items);
    removed
}

/// Move the item at `from` so it ends up at index `to`.
pub fn move_to<P>(items: &mut Vec<ContentItem<P>>, from: usize, to: usize) {
    if from != to {
        let it = items.remove(from);
        items.insert(to, it);
    }
    renumber(items);
}
