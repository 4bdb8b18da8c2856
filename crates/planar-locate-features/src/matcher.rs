use crate::{Descriptor, DescriptorMatch, DescriptorMatcher};

#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Exhaustive Hamming search. Neighbours are ordered by distance, ties by
/// train index, so results do not depend on iteration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceMatcher;

impl DescriptorMatcher for BruteForceMatcher {
    fn knn_match(
        &self,
        query: &[Descriptor],
        train: &[Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>> {
        query
            .iter()
            .enumerate()
            .map(|(query_idx, q)| {
                let mut all: Vec<DescriptorMatch> = train
                    .iter()
                    .enumerate()
                    .map(|(train_idx, t)| DescriptorMatch {
                        query_idx,
                        train_idx,
                        distance: hamming_distance(q, t),
                    })
                    .collect();
                let k = k.min(all.len());
                if k == 0 {
                    return Vec::new();
                }
                let key = |m: &DescriptorMatch| (m.distance, m.train_idx);
                all.select_nth_unstable_by_key(k - 1, key);
                all.truncate(k);
                all.sort_unstable_by_key(key);
                all
            })
            .collect()
    }
}
