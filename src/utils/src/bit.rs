pub fn mask_of<T: num::One + num::FromPrimitive + std::ops::Shl<Output = T>>(i: i32) -> T {
    T::one() << T::from_i32(i).unwrap()
}

// one_hot_index returns the position of the only set bit of n, or None if n
// has zero or several bits set.
pub fn one_hot_index(n: u64) -> Option<u32> {
    if n.count_ones() == 1 {
        Some(n.trailing_zeros())
    } else {
        None
    }
}
