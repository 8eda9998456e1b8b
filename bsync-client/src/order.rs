//! Array move
//!
//! Relocates one element; everything between the old and new positions shifts by
//! one slot, everything outside that range stays put.

/// Move the element at `from` to `to`, returning the new order
///
/// `None` if either index is out of bounds.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    if from >= items.len() || to >= items.len() {
        return None;
    }
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Some(moved)
}
