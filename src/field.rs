//! Finite-field arithmetic for prime-power orders.
//!
//! The orthogonal-grid pass of the mask generator needs `slope · row + offset`
//! to behave like arithmetic in a field of `order` elements. For a prime
//! order that is plain arithmetic mod `p`; for `p^e` with `e > 1` it is
//! GF(p^e), with elements encoded as base-`p` digit vectors (least
//! significant digit first) and multiplication reduced by a fixed monic
//! irreducible polynomial.

use crate::error::BibdError;

/// Returns `(p, e)` such that `order == p^e` with `p` prime, or `None`.
pub fn prime_power(order: usize) -> Option<(usize, u32)> {
    if order < 2 {
        return None;
    }
    let p = smallest_prime_factor(order);
    let mut rest = order;
    let mut exponent = 0;
    while rest % p == 0 {
        rest /= p;
        exponent += 1;
    }
    (rest == 1).then_some((p, exponent))
}

pub fn is_prime_power(order: usize) -> bool {
    prime_power(order).is_some()
}

fn smallest_prime_factor(n: usize) -> usize {
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return d;
        }
        d += 1;
    }
    n
}

/// The finite field GF(p^e).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisField {
    characteristic: usize,
    degree: u32,
    order: usize,
    /// Monic modulus, coefficients low to high (`degree + 1` entries).
    modulus: Vec<usize>,
}

impl GaloisField {
    pub fn new(order: usize) -> Result<Self, BibdError> {
        if order < 2 {
            return Err(BibdError::InvalidOrder { order });
        }
        let (p, e) = prime_power(order).ok_or(BibdError::NotPrimePower { order })?;
        let modulus = if e == 1 {
            vec![0, 1]
        } else {
            smallest_irreducible(p, e as usize).ok_or(BibdError::NotPrimePower { order })?
        };
        Ok(Self {
            characteristic: p,
            degree: e,
            order,
            modulus,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn characteristic(&self) -> usize {
        self.characteristic
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Coefficients of the reduction polynomial, lowest degree first.
    pub fn modulus(&self) -> &[usize] {
        &self.modulus
    }

    pub fn add(&self, a: usize, b: usize) -> usize {
        let p = self.characteristic;
        if self.degree == 1 {
            return (a + b) % p;
        }
        let sum: Vec<usize> = self
            .digits(a)
            .into_iter()
            .zip(self.digits(b))
            .map(|(x, y)| (x + y) % p)
            .collect();
        self.from_digits(&sum)
    }

    pub fn mul(&self, a: usize, b: usize) -> usize {
        let p = self.characteristic;
        if self.degree == 1 {
            return (a * b) % p;
        }
        let product = poly_mul(&self.digits(a), &self.digits(b), p);
        self.from_digits(&poly_rem(product, &self.modulus, p))
    }

    fn digits(&self, value: usize) -> Vec<usize> {
        to_digits(value % self.order, self.characteristic, self.degree as usize)
    }

    fn from_digits(&self, digits: &[usize]) -> usize {
        digits
            .iter()
            .rev()
            .fold(0, |acc, &d| acc * self.characteristic + d)
    }
}

fn to_digits(mut value: usize, base: usize, len: usize) -> Vec<usize> {
    let mut digits = Vec::with_capacity(len);
    for _ in 0..len {
        digits.push(value % base);
        value /= base;
    }
    digits
}

fn poly_mul(a: &[usize], b: &[usize], p: usize) -> Vec<usize> {
    let mut out = vec![0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] = (out[i + j] + x * y) % p;
        }
    }
    out
}

/// Remainder of `a` modulo the monic polynomial `m`.
fn poly_rem(mut a: Vec<usize>, m: &[usize], p: usize) -> Vec<usize> {
    let d = m.len() - 1;
    if a.len() < d {
        a.resize(d, 0);
    }
    for i in (d..a.len()).rev() {
        let c = a[i];
        if c == 0 {
            continue;
        }
        for (j, &mj) in m.iter().enumerate() {
            let idx = i - d + j;
            a[idx] = (a[idx] + p - (c * mj) % p) % p;
        }
    }
    a.truncate(d);
    a
}

fn monic(index: usize, p: usize, degree: usize) -> Vec<usize> {
    let mut coeffs = to_digits(index, p, degree);
    coeffs.push(1);
    coeffs
}

fn is_irreducible(f: &[usize], p: usize) -> bool {
    let degree = f.len() - 1;
    for d in 1..=degree / 2 {
        for index in 0..p.pow(d as u32) {
            let divisor = monic(index, p, d);
            if poly_rem(f.to_vec(), &divisor, p).iter().all(|&c| c == 0) {
                return false;
            }
        }
    }
    true
}

/// First monic irreducible polynomial of `degree` over GF(p) in digit order.
fn smallest_irreducible(p: usize, degree: usize) -> Option<Vec<usize>> {
    (0..p.pow(degree as u32))
        .map(|index| monic(index, p, degree))
        .find(|f| f[0] != 0 && is_irreducible(f, p))
}
