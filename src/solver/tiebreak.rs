use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Decides the order of candidates that scored equally.
///
/// `tied` holds candidate positions; implementations may permute it freely.
/// Any closure `FnMut(&mut [usize])` is a tie-break.
pub trait TieBreak {
    fn order_ties(&mut self, tied: &mut [usize]);
}

impl<F> TieBreak for F
where
    F: FnMut(&mut [usize]),
{
    fn order_ties(&mut self, tied: &mut [usize]) {
        self(tied)
    }
}

/// Shuffles ties with a seeded generator; keeps them in generation order when
/// no seed is given.
#[derive(Debug, Clone)]
pub struct SeededTieBreak {
    rng: Option<StdRng>,
}

impl SeededTieBreak {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map(StdRng::seed_from_u64),
        }
    }
}

impl TieBreak for SeededTieBreak {
    fn order_ties(&mut self, tied: &mut [usize]) {
        if let Some(rng) = self.rng.as_mut() {
            tied.shuffle(rng);
        }
    }
}

/// Sorts candidates best-first; runs of equal score are handed to `tie_break`.
pub(crate) fn rank<T: Copy, B: TieBreak + ?Sized>(candidates: &mut [(f64, T)], tie_break: &mut B) {
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut start = 0;
    while start < candidates.len() {
        let mut end = start + 1;
        while end < candidates.len() && (candidates[start].0 - candidates[end].0).abs() <= 1e-9 {
            end += 1;
        }
        if end - start > 1 {
            let mut order: Vec<usize> = (start..end).collect();
            tie_break.order_ties(&mut order);
            let group: Vec<(f64, T)> = order.iter().map(|&i| candidates[i]).collect();
            candidates[start..end].copy_from_slice(&group);
        }
        start = end;
    }
}
