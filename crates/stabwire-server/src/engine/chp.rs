//! CHP stabilizer tableau (Aaronson and Gottesman, 2004).
//!
//! Rows `0..n` hold destabilizers, rows `n..2n` stabilizers, and row `2n` is
//! scratch space for deterministic measurements. Each row is a Pauli string
//! stored as packed X and Z bit vectors plus a sign bit.

use rand::Rng;

const WORD_BITS: usize = 64;

/// Outcome of a single-qubit Z measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureOutcome {
    /// The qubit was in a Z eigenstate.
    Determined(bool),
    /// The outcome was drawn at random and the state collapsed.
    Random(bool),
}

impl MeasureOutcome {
    pub fn bit(self) -> bool {
        match self {
            MeasureOutcome::Determined(b) | MeasureOutcome::Random(b) => b,
        }
    }

    pub fn is_random(self) -> bool {
        matches!(self, MeasureOutcome::Random(_))
    }
}

/// A stabilizer state on `n` qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tableau {
    n: usize,
    words: usize,
    x: Vec<u64>,
    z: Vec<u64>,
    r: Vec<bool>,
}

impl Tableau {
    /// Create a register of `n` qubits in |0...0⟩.
    pub fn new(n: usize) -> Self {
        let words = n.div_ceil(WORD_BITS).max(1);
        let rows = 2 * n + 1;
        let mut tableau = Self {
            n,
            words,
            x: vec![0; rows * words],
            z: vec![0; rows * words],
            r: vec![false; rows],
        };
        for i in 0..n {
            let (w, m) = Self::locate(i);
            tableau.x[i * words + w] |= m;
            tableau.z[(n + i) * words + w] |= m;
        }
        tableau
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.n
    }

    #[inline]
    fn locate(qubit: usize) -> (usize, u64) {
        (qubit / WORD_BITS, 1u64 << (qubit % WORD_BITS))
    }

    #[inline]
    fn x_bit(&self, row: usize, qubit: usize) -> bool {
        let (w, m) = Self::locate(qubit);
        self.x[row * self.words + w] & m != 0
    }

    #[inline]
    fn z_bit(&self, row: usize, qubit: usize) -> bool {
        let (w, m) = Self::locate(qubit);
        self.z[row * self.words + w] & m != 0
    }

    fn check(&self, qubit: usize) {
        assert!(
            qubit < self.n,
            "qubit {qubit} out of range for {} qubits",
            self.n
        );
    }

    /// Hadamard on `a`.
    pub fn h(&mut self, a: usize) {
        self.check(a);
        let (w, m) = Self::locate(a);
        for row in 0..2 * self.n {
            let idx = row * self.words + w;
            let xb = self.x[idx] & m;
            let zb = self.z[idx] & m;
            if xb != 0 && zb != 0 {
                self.r[row] ^= true;
            }
            self.x[idx] = (self.x[idx] & !m) | zb;
            self.z[idx] = (self.z[idx] & !m) | xb;
        }
    }

    /// Phase gate S on `a`.
    pub fn s(&mut self, a: usize) {
        self.check(a);
        let (w, m) = Self::locate(a);
        for row in 0..2 * self.n {
            let idx = row * self.words + w;
            let xb = self.x[idx] & m;
            if xb != 0 && self.z[idx] & m != 0 {
                self.r[row] ^= true;
            }
            self.z[idx] ^= xb;
        }
    }

    /// Pauli X on `a`: flips the sign of rows with a Z component on `a`.
    pub fn x(&mut self, a: usize) {
        self.check(a);
        for row in 0..2 * self.n {
            if self.z_bit(row, a) {
                self.r[row] ^= true;
            }
        }
    }

    /// Pauli Z on `a`: flips the sign of rows with an X component on `a`.
    pub fn z(&mut self, a: usize) {
        self.check(a);
        for row in 0..2 * self.n {
            if self.x_bit(row, a) {
                self.r[row] ^= true;
            }
        }
    }

    /// Pauli Y on `a`.
    pub fn y(&mut self, a: usize) {
        self.check(a);
        for row in 0..2 * self.n {
            if self.x_bit(row, a) != self.z_bit(row, a) {
                self.r[row] ^= true;
            }
        }
    }

    /// CNOT with control `a` and target `b`.
    pub fn cnot(&mut self, a: usize, b: usize) {
        self.check(a);
        self.check(b);
        assert_ne!(a, b, "cnot control and target must differ");
        let (wa, ma) = Self::locate(a);
        let (wb, mb) = Self::locate(b);
        for row in 0..2 * self.n {
            let base = row * self.words;
            let xa = self.x[base + wa] & ma != 0;
            let xb = self.x[base + wb] & mb != 0;
            let za = self.z[base + wa] & ma != 0;
            let zb = self.z[base + wb] & mb != 0;
            if xa && zb && (xb == za) {
                self.r[row] ^= true;
            }
            if xa {
                self.x[base + wb] ^= mb;
            }
            if zb {
                self.z[base + wa] ^= ma;
            }
        }
    }

    /// Measure `a` in the computational basis.
    pub fn measure<R: Rng + ?Sized>(&mut self, a: usize, rng: &mut R) -> MeasureOutcome {
        self.check(a);
        let n = self.n;

        match (n..2 * n).find(|&p| self.x_bit(p, a)) {
            Some(p) => {
                for i in 0..2 * n {
                    if i != p && self.x_bit(i, a) {
                        self.rowsum(i, p);
                    }
                }
                self.copy_row(p, p - n);
                self.clear_row(p);
                let (w, m) = Self::locate(a);
                self.z[p * self.words + w] = m;
                let outcome = rng.r#gen::<bool>();
                self.r[p] = outcome;
                MeasureOutcome::Random(outcome)
            }
            None => {
                let scratch = 2 * n;
                self.clear_row(scratch);
                for i in 0..n {
                    if self.x_bit(i, a) {
                        self.rowsum(scratch, i + n);
                    }
                }
                MeasureOutcome::Determined(self.r[scratch])
            }
        }
    }

    fn copy_row(&mut self, from: usize, to: usize) {
        let w = self.words;
        self.x.copy_within(from * w..(from + 1) * w, to * w);
        self.z.copy_within(from * w..(from + 1) * w, to * w);
        self.r[to] = self.r[from];
    }

    fn clear_row(&mut self, row: usize) {
        let w = self.words;
        self.x[row * w..(row + 1) * w].fill(0);
        self.z[row * w..(row + 1) * w].fill(0);
        self.r[row] = false;
    }

    /// Left-multiply row `h` by row `i`, tracking the sign.
    fn rowsum(&mut self, h: usize, i: usize) {
        let w = self.words;
        // Phase exponent of i, modulo 4.
        let mut e: i64 = 2 * i64::from(self.r[h]) + 2 * i64::from(self.r[i]);

        for k in 0..w {
            let x1 = self.x[i * w + k];
            let z1 = self.z[i * w + k];
            let x2 = self.x[h * w + k];
            let z2 = self.z[h * w + k];

            let plus = (x1 & z1 & z2 & !x2) | (x1 & !z1 & z2 & x2) | (!x1 & z1 & x2 & !z2);
            let minus = (x1 & z1 & x2 & !z2) | (x1 & !z1 & z2 & !x2) | (!x1 & z1 & x2 & z2);
            e += i64::from(plus.count_ones()) - i64::from(minus.count_ones());

            self.x[h * w + k] = x1 ^ x2;
            self.z[h * w + k] = z1 ^ z2;
        }

        debug_assert!(e.rem_euclid(4) % 2 == 0, "commuting rows yield a real phase");
        self.r[h] = e.rem_euclid(4) == 2;
    }

    /// Stabilizer generators as signed Pauli strings, e.g. `+XX`, `-ZZ`.
    pub fn stabilizers(&self) -> Vec<String> {
        (self.n..2 * self.n)
            .map(|row| {
                let mut s = String::with_capacity(self.n + 1);
                s.push(if self.r[row] { '-' } else { '+' });
                for q in 0..self.n {
                    s.push(match (self.x_bit(row, q), self.z_bit(row, q)) {
                        (false, false) => 'I',
                        (true, false) => 'X',
                        (false, true) => 'Z',
                        (true, true) => 'Y',
                    });
                }
                s
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_initial_state_is_all_zero() {
        let mut t = Tableau::new(3);
        let mut rng = rng();
        assert_eq!(t.stabilizers(), vec!["+ZII", "+IZI", "+IIZ"]);
        for q in 0..3 {
            assert_eq!(t.measure(q, &mut rng), MeasureOutcome::Determined(false));
        }
    }

    #[test]
    fn test_x_flips_deterministically() {
        let mut t = Tableau::new(2);
        let mut rng = rng();
        t.x(1);
        assert_eq!(t.measure(0, &mut rng), MeasureOutcome::Determined(false));
        assert_eq!(t.measure(1, &mut rng), MeasureOutcome::Determined(true));
    }

    #[test]
    fn test_y_and_z() {
        let mut t = Tableau::new(1);
        let mut rng = rng();
        t.z(0);
        assert!(!t.measure(0, &mut rng).bit());
        t.y(0);
        assert_eq!(t.measure(0, &mut rng), MeasureOutcome::Determined(true));
    }

    #[test]
    fn test_hadamard_gives_random_then_repeatable() {
        let mut t = Tableau::new(1);
        let mut rng = rng();
        t.h(0);
        let first = t.measure(0, &mut rng);
        assert!(first.is_random());
        let again = t.measure(0, &mut rng);
        assert_eq!(again, MeasureOutcome::Determined(first.bit()));
    }

    #[test]
    fn test_hh_is_identity() {
        let mut t = Tableau::new(1);
        t.h(0);
        t.h(0);
        assert_eq!(t, Tableau::new(1));
    }

    #[test]
    fn test_ss_is_z() {
        let mut a = Tableau::new(1);
        a.h(0);
        a.s(0);
        a.s(0);
        let mut b = Tableau::new(1);
        b.h(0);
        b.z(0);
        assert_eq!(a, b);
        assert_eq!(a.stabilizers(), vec!["-X"]);
    }

    #[test]
    fn test_bell_pair_correlated() {
        let mut rng = rng();
        for _ in 0..50 {
            let mut t = Tableau::new(2);
            t.h(0);
            t.cnot(0, 1);
            assert_eq!(t.stabilizers(), vec!["+XX", "+ZZ"]);
            let a = t.measure(0, &mut rng);
            let b = t.measure(1, &mut rng);
            assert!(a.is_random());
            assert_eq!(b, MeasureOutcome::Determined(a.bit()));
        }
    }

    #[test]
    fn test_wide_register_crosses_word_boundary() {
        let mut t = Tableau::new(130);
        let mut rng = rng();
        t.x(64);
        t.cnot(64, 129);
        t.h(3);
        t.cnot(3, 127);
        assert!(t.measure(64, &mut rng).bit());
        assert_eq!(t.measure(129, &mut rng), MeasureOutcome::Determined(true));
        let a = t.measure(3, &mut rng).bit();
        assert_eq!(t.measure(127, &mut rng), MeasureOutcome::Determined(a));
    }

    #[test]
    fn test_empty_register() {
        let t = Tableau::new(0);
        assert_eq!(t.num_qubits(), 0);
        assert!(t.stabilizers().is_empty());
    }
}
