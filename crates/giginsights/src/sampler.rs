//! Bounded random sampling of complaint records.
//!
//! Keeps prompt size and cost bounded regardless of corpus size. Samples are
//! drawn uniformly without replacement using a partial Fisher-Yates shuffle
//! over an index table, so the caller's slice is never reordered.

use rand::Rng;

/// Draw `min(k, records.len())` distinct records using the thread RNG.
pub fn sample<T: Clone>(records: &[T], k: usize) -> Vec<T> {
    sample_with(&mut rand::thread_rng(), records, k)
}

/// Draw `min(k, records.len())` distinct records using the given RNG.
pub fn sample_with<T: Clone, R: Rng + ?Sized>(rng: &mut R, records: &[T], k: usize) -> Vec<T> {
    let take = k.min(records.len());
    let mut indices: Vec<usize> = (0..records.len()).collect();

    for i in 0..take {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }

    indices[..take].iter().map(|&i| records[i].clone()).collect()
}
