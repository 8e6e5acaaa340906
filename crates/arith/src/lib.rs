//! arith: shared exact-rational arithmetic plus the tagged numeric value
//! underlying the CAS kernel's scalar constants.
//! - Tuple-based rationals: (num, den) with helpers q_* and rat_*
//! - Newtype `Q(i64, i64)` for use in the expression kernel
//! - `Num`: integer/rational/real with graceful demotion to real
//!
//!   All rationals are normalized with den>0 and gcd(|num|, den)=1.

#![deny(warnings)]

use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Q(pub i64, pub i64);

impl Q {
    pub fn new(num: i64, den: i64) -> Self {
        let (n, d) = normalize_rat(num, den);
        Q(n, d)
    }
    pub fn zero() -> Self {
        Q(0, 1)
    }
    pub fn one() -> Self {
        Q(1, 1)
    }
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
    pub fn is_one(&self) -> bool {
        self.0 == 1 && self.1 == 1
    }
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / self.1 as f64
    }
}

// ---------- Integer gcd ----------
pub fn gcd_i64(mut a: i64, mut b: i64) -> i64 {
    if a == 0 {
        return b.abs();
    }
    if b == 0 {
        return a.abs();
    }
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

// ---------- Tuple rational helpers ----------
/// Normalize (num, den) to gcd-reduced with den>0. Returns `None` on `den == 0`
/// instead of panicking, so callers at a library boundary can surface a typed error.
pub fn try_normalize_rat(num: i64, den: i64) -> Option<(i64, i64)> {
    if den == 0 {
        return None;
    }
    let mut n = num;
    let mut d = den;
    if d < 0 {
        n = -n;
        d = -d;
    }
    if n == 0 {
        return Some((0, 1));
    }
    let g = gcd_i64(n.abs(), d);
    Some((n / g, d / g))
}

/// Infallible normalization for call sites that already know `den != 0`.
pub fn normalize_rat(num: i64, den: i64) -> (i64, i64) {
    try_normalize_rat(num, den).expect("zero denominator")
}

pub fn rat_add(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    normalize_rat(a.0 * b.1 + b.0 * a.1, a.1 * b.1)
}
pub fn rat_mul(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    normalize_rat(a.0 * b.0, a.1 * b.1)
}
pub fn rat_sub(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    rat_add(a, (-b.0, b.1))
}

pub fn q_norm(n: i64, d: i64) -> (i64, i64) {
    normalize_rat(n, d)
}
pub fn q_add(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    rat_add(a, b)
}
pub fn q_sub(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    rat_sub(a, b)
}
pub fn q_mul(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    rat_mul(a, b)
}
pub fn q_div(a: (i64, i64), b: (i64, i64)) -> (i64, i64) {
    normalize_rat(a.0 * b.1, a.1 * b.0)
}

// ---------- Q arithmetic helpers ----------
pub fn add_q(a: Q, b: Q) -> Q {
    let (n, d) = rat_add((a.0, a.1), (b.0, b.1));
    Q(n, d)
}
pub fn sub_q(a: Q, b: Q) -> Q {
    let (n, d) = rat_sub((a.0, a.1), (b.0, b.1));
    Q(n, d)
}
pub fn mul_q(a: Q, b: Q) -> Q {
    let (n, d) = rat_mul((a.0, a.1), (b.0, b.1));
    Q(n, d)
}
pub fn div_q(a: Q, b: Q) -> Q {
    let (n, d) = q_div((a.0, a.1), (b.0, b.1));
    Q(n, d)
}

// ---------- Tagged numeric value ----------

/// A scalar numeric value: exact where possible, with graceful demotion to `f64`.
#[derive(Clone, Copy, Debug)]
pub enum Num {
    Integer(i64),
    Rational(Q),
    Real(f64),
}

impl Num {
    pub fn rational(num: i64, den: i64) -> Option<Self> {
        let (n, d) = try_normalize_rat(num, den)?;
        Some(if d == 1 { Num::Integer(n) } else { Num::Rational(Q(n, d)) })
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Num::Integer(i) => *i == 0,
            Num::Rational(q) => q.is_zero(),
            Num::Real(r) => *r == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Num::Integer(i) => *i == 1,
            Num::Rational(q) => q.is_one(),
            Num::Real(r) => *r == 1.0,
        }
    }

    pub fn sign(&self) -> Sign {
        let v = match self {
            Num::Integer(i) => *i as f64,
            Num::Rational(q) => q.to_f64(),
            Num::Real(r) => *r,
        };
        if v > 0.0 {
            Sign::Positive
        } else if v < 0.0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }

    /// A real approximation, when finite.
    pub fn try_numeric(&self) -> Option<f64> {
        let v = self.to_f64();
        v.is_finite().then_some(v)
    }

    /// A real approximation, with no finiteness check (`Integer`/`Rational`
    /// division can still yield `NAN`/`inf` e.g. `Rational(Q(1, 0))` is
    /// unreachable via `Q::new`, but callers crossing crate boundaries want an
    /// infallible conversion the way `try_numeric` intentionally isn't).
    pub fn to_f64(&self) -> f64 {
        match self {
            Num::Integer(i) => *i as f64,
            Num::Rational(q) => q.to_f64(),
            Num::Real(r) => *r,
        }
    }

    pub fn negate(&self) -> Num {
        match self {
            Num::Integer(i) => Num::Integer(-i),
            Num::Rational(q) => Num::Rational(Q(-q.0, q.1)),
            Num::Real(r) => Num::Real(-r),
        }
    }

    pub fn add(&self, other: &Num) -> Num {
        match (self, other) {
            (Num::Integer(a), Num::Integer(b)) => Num::Integer(a + b),
            (Num::Real(_), _) | (_, Num::Real(_)) => Num::Real(self.to_f64() + other.to_f64()),
            _ => {
                let (n, d) = rat_add(self.as_tuple(), other.as_tuple());
                Num::rational(n, d).unwrap_or(Num::Real(n as f64 / d as f64))
            }
        }
    }

    pub fn mul(&self, other: &Num) -> Num {
        match (self, other) {
            (Num::Integer(a), Num::Integer(b)) => Num::Integer(a * b),
            (Num::Real(_), _) | (_, Num::Real(_)) => Num::Real(self.to_f64() * other.to_f64()),
            _ => {
                let (n, d) = rat_mul(self.as_tuple(), other.as_tuple());
                Num::rational(n, d).unwrap_or(Num::Real(n as f64 / d as f64))
            }
        }
    }

    pub fn sub(&self, other: &Num) -> Num {
        self.add(&other.negate())
    }

    /// Division by zero is a caller-facing error, not representable as `Num`;
    /// returns `None` and lets the caller surface `CasError::InvalidExpression`.
    pub fn div(&self, other: &Num) -> Option<Num> {
        if other.is_zero() {
            return None;
        }
        Some(match (self, other) {
            (Num::Real(_), _) | (_, Num::Real(_)) => Num::Real(self.to_f64() / other.to_f64()),
            _ => {
                let (n, d) = q_div(self.as_tuple(), other.as_tuple());
                Num::rational(n, d).unwrap_or(Num::Real(n as f64 / d as f64))
            }
        })
    }

    /// `pow(rational, integer)` stays exact; anything else demotes to real.
    pub fn pow(&self, exp: &Num) -> Num {
        if let (Num::Integer(e), base) = (exp, self) {
            if let Some(result) = pow_exact(base, *e) {
                return result;
            }
        }
        Num::Real(self.to_f64().powf(exp.to_f64()))
    }

    fn as_tuple(&self) -> (i64, i64) {
        match self {
            Num::Integer(i) => (*i, 1),
            Num::Rational(q) => (q.0, q.1),
            Num::Real(_) => unreachable!("Real handled by caller before as_tuple"),
        }
    }
}

fn pow_exact(base: &Num, exp: i64) -> Option<Num> {
    match base {
        Num::Real(_) => None,
        _ => {
            if exp == 0 {
                return Some(Num::Integer(1));
            }
            let (n, d) = base.as_tuple();
            let negative = exp < 0;
            let mut k = exp.unsigned_abs();
            let (mut out_n, mut out_d) = (1i64, 1i64);
            while k > 0 {
                out_n = out_n.checked_mul(n)?;
                out_d = out_d.checked_mul(d)?;
                k -= 1;
            }
            if negative {
                std::mem::swap(&mut out_n, &mut out_d);
                if out_d < 0 {
                    out_n = -out_n;
                    out_d = -out_d;
                }
            }
            Num::rational(out_n, out_d)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// Total order over `Num`: integers < rationals < reals, natural order within a kind.
/// `f64::NAN` (unrepresentable in a finite-valued CAS) sorts last so `Ord` never panics.
impl Num {
    fn kind_rank(&self) -> u8 {
        match self {
            Num::Integer(_) => 0,
            Num::Rational(_) => 1,
            Num::Real(_) => 2,
        }
    }
}

impl PartialEq for Num {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Num {}

impl PartialOrd for Num {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Num {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.kind_rank(), other.kind_rank()) {
            (a, b) if a != b => a.cmp(&b),
            _ => match (self, other) {
                (Num::Integer(a), Num::Integer(b)) => a.cmp(b),
                (Num::Rational(a), Num::Rational(b)) => {
                    (a.0 as i128 * b.1 as i128).cmp(&(b.0 as i128 * a.1 as i128))
                }
                (Num::Real(a), Num::Real(b)) => match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => a.partial_cmp(b).unwrap(),
                },
                _ => unreachable!("kind_rank guards mismatched variants"),
            },
        }
    }
}

impl std::hash::Hash for Num {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Num::Integer(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            Num::Rational(q) => {
                1u8.hash(state);
                q.hash(state);
            }
            Num::Real(r) => {
                2u8.hash(state);
                r.to_bits().hash(state);
            }
        }
    }
}
