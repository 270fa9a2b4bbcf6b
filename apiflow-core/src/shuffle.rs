/// Returns a shuffled copy of `items`, leaving the input untouched.
pub fn shuffle<T: Clone>(items: &[T], rng: &mut fastrand::Rng) -> Vec<T> {
    let mut out = items.to_vec();
    rng.shuffle(&mut out);
    out
}
