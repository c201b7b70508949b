use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;

/// Packing order of the rectangles. Every gene is a 1-based rectangle index, a negative gene means
/// the rectangle is rotated by 90°.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Chromosome {
    pub genes: Vec<i32>,
}

impl Chromosome {
    /// Unrotated chromosome packing the rectangles in the given order (0-based indices)
    pub fn from_order(order: &[usize]) -> Self {
        Chromosome {
            genes: order.iter().map(|i| *i as i32 + 1).collect(),
        }
    }

    /// Random permutation of `n` rectangles, with random rotations if `rotatable`
    pub fn random(n: usize, rotatable: bool, rng: &mut impl Rng) -> Self {
        let mut genes = (1..=n as i32).collect_vec();
        genes.shuffle(rng);
        if rotatable {
            for g in genes.iter_mut() {
                if rng.random_bool(0.5) {
                    *g = -*g;
                }
            }
        }
        Chromosome { genes }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// (0-based rectangle index, rotated) of every gene, in packing order
    pub fn decode(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.genes
            .iter()
            .map(|g| (g.unsigned_abs() as usize - 1, *g < 0))
    }

    /// Order crossover (OX): the child inherits a random slice of `self` in place, the remaining
    /// positions are filled with the other genes in the order they appear in `other`, starting after the slice.
    /// Every gene keeps the sign it has in the parent it came from.
    pub fn order_crossover(&self, other: &Chromosome, rng: &mut impl Rng) -> Chromosome {
        let n = self.len();
        if n < 2 {
            return self.clone();
        }
        let (a, b) = (rng.random_range(0..n), rng.random_range(0..n));
        let (start, end) = (a.min(b), a.max(b));

        let mut taken = vec![false; n];
        let mut genes = vec![0; n];
        for i in start..=end {
            genes[i] = self.genes[i];
            taken[self.genes[i].unsigned_abs() as usize - 1] = true;
        }

        let mut donor = (0..n)
            .map(|k| other.genes[(end + 1 + k) % n])
            .filter(|g| !taken[g.unsigned_abs() as usize - 1]);
        for k in 0..(n - (end - start + 1)) {
            let pos = (end + 1 + k) % n;
            genes[pos] = donor.next().unwrap_or_default();
        }

        Chromosome { genes }
    }

    /// Swaps two random genes
    pub fn swap_mutation(&mut self, rng: &mut impl Rng) {
        let n = self.len();
        if n < 2 {
            return;
        }
        let (a, b) = (rng.random_range(0..n), rng.random_range(0..n));
        self.genes.swap(a, b);
    }

    /// Toggles the rotation of a random gene
    pub fn flip_mutation(&mut self, rng: &mut impl Rng) {
        if self.is_empty() {
            return;
        }
        let i = rng.random_range(0..self.len());
        self.genes[i] = -self.genes[i];
    }

    /// True if the absolute values of the genes form a permutation of `1..=n`
    pub fn is_valid(&self) -> bool {
        let n = self.len();
        let mut seen = vec![false; n];
        self.genes.iter().all(|g| {
            let i = g.unsigned_abs() as usize;
            match i >= 1 && i <= n && !seen[i - 1] {
                true => {
                    seen[i - 1] = true;
                    true
                }
                false => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::prelude::SmallRng;

    use super::*;

    #[test]
    fn from_order_is_unrotated_and_one_based() {
        let c = Chromosome::from_order(&[2, 0, 1]);
        assert_eq!(c.genes, vec![3, 1, 2]);
        assert_eq!(c.decode().collect_vec(), vec![(2, false), (0, false), (1, false)]);
        assert!(c.is_valid());
    }

    #[test]
    fn operators_preserve_the_permutation() {
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..200 {
            let a = Chromosome::random(12, true, &mut rng);
            let b = Chromosome::random(12, true, &mut rng);
            assert!(a.is_valid() && b.is_valid());

            let mut child = a.order_crossover(&b, &mut rng);
            assert!(child.is_valid(), "{child:?}");
            child.swap_mutation(&mut rng);
            assert!(child.is_valid(), "{child:?}");
            child.flip_mutation(&mut rng);
            assert!(child.is_valid(), "{child:?}");
        }
    }

    #[test]
    fn unrotatable_random_chromosomes_have_positive_genes() {
        let mut rng = SmallRng::seed_from_u64(1);
        let c = Chromosome::random(20, false, &mut rng);
        assert!(c.genes.iter().all(|g| *g > 0));
    }

    #[test]
    fn crossover_keeps_signs_of_the_donating_parent() {
        let mut rng = SmallRng::seed_from_u64(2);
        let a = Chromosome { genes: vec![1, 2, 3, 4, 5] };
        let b = Chromosome { genes: vec![-5, -4, -3, -2, -1] };
        for _ in 0..50 {
            let child = a.order_crossover(&b, &mut rng);
            assert!(child.is_valid());
            for (i, g) in child.genes.iter().enumerate() {
                //positive genes stem from `a` and kept their position
                if *g > 0 {
                    assert_eq!(a.genes[i], *g);
                }
            }
        }
    }

    #[test]
    fn invalid_chromosomes_are_detected() {
        assert!(!Chromosome { genes: vec![1, 1, 2] }.is_valid());
        assert!(!Chromosome { genes: vec![1, 4, 2] }.is_valid());
        assert!(!Chromosome { genes: vec![0, 1] }.is_valid());
        assert!(Chromosome { genes: vec![-2, 1] }.is_valid());
    }
}
