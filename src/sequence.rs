//! Boomerang playback order
use crate::error::{Error, Result};

/// Encode order for `len` frames: forward through all of them, then back
/// down to the second one, so the loop wraps to frame 0 without showing
/// either endpoint twice.
pub fn boomerang_order(len: usize) -> Result<Vec<usize>> {
    if len == 0 {
        return Err(Error::EmptySequence);
    }
    let reverse = (1..len.saturating_sub(1)).rev();
    Ok((0..len).chain(reverse).collect())
}

/// Applies [`boomerang_order`] to a slice.
pub fn boomerang<T: Clone>(frames: &[T]) -> Result<Vec<T>> {
    Ok(boomerang_order(frames.len())?
        .into_iter()
        .map(|i| frames[i].clone())
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_sequence() {
        assert!(matches!(boomerang_order(0), Err(Error::EmptySequence)));
    }

    #[test]
    fn single_and_pair() {
        assert_eq!(boomerang_order(1).unwrap(), [0]);
        assert_eq!(boomerang_order(2).unwrap(), [0, 1]);
    }

    #[test]
    fn forward_then_back() {
        assert_eq!(boomerang_order(3).unwrap(), [0, 1, 2, 1]);
        assert_eq!(boomerang(&["a", "b", "c", "d"]).unwrap(), ["a", "b", "c", "d", "c", "b"]);
    }

    #[test]
    fn endpoints_once_interior_twice() {
        for n in 2..12 {
            let order = boomerang_order(n).unwrap();
            assert_eq!(order.len(), 2 * n - 2);
            for frame in 0..n {
                let count = order.iter().filter(|&&i| i == frame).count();
                let expected = if frame == 0 || frame == n - 1 { 1 } else { 2 };
                assert_eq!(count, expected, "frame {} of {}", frame, n);
            }
        }
    }
}
