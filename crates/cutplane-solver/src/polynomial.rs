use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Key of the constant term in the coefficient map
pub const CONSTANT: &str = "";

/// A linear expression over named variables with exact rational coefficients.
///
/// Terms are kept in a `BTreeMap` so iteration order (and therefore the column
/// order of anything built from a polynomial) is deterministic. Zero
/// coefficients are never stored.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polynomial {
    terms: BTreeMap<String, BigRational>,
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: BigRational) -> Self {
        Self::term(CONSTANT, value)
    }

    /// The expression `1 * name`
    pub fn var(name: impl Into<String>) -> Self {
        Self::term(name, BigRational::one())
    }

    /// The expression `coeff * name` (a constant when `name` is empty)
    pub fn term(name: impl Into<String>, coeff: BigRational) -> Self {
        let mut poly = Self::zero();
        poly.add_term(name.into(), coeff);
        poly
    }

    /// Coefficient of `name`, zero when absent. `coefficient("")` is the constant term.
    pub fn coefficient(&self, name: &str) -> BigRational {
        self.terms.get(name).cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn constant_term(&self) -> BigRational {
        self.coefficient(CONSTANT)
    }

    /// All stored terms, the constant (empty key) included.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &BigRational)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of the variables with a non-zero coefficient, in order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms
            .keys()
            .filter(|k| k.as_str() != CONSTANT)
            .map(String::as_str)
    }

    pub fn is_constant(&self) -> bool {
        self.variables().next().is_none()
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Replaces every occurrence of `name` with `replacement`, in place.
    pub fn substitute(&mut self, name: &str, replacement: &Polynomial) {
        if name == CONSTANT {
            return;
        }
        if let Some(coeff) = self.terms.remove(name) {
            *self += &replacement.scaled(&coeff);
        }
    }

    pub fn scaled(&self, factor: &BigRational) -> Polynomial {
        let mut out = Polynomial::zero();
        for (name, coeff) in &self.terms {
            out.add_term(name.clone(), coeff * factor);
        }
        out
    }

    /// Value of the expression under `assignment`, `None` if a variable is unassigned.
    pub fn evaluate(&self, assignment: &BTreeMap<String, BigRational>) -> Option<BigRational> {
        let mut total = self.constant_term();
        for name in self.variables() {
            total += assignment.get(name)? * &self.terms[name];
        }
        Some(total)
    }

    fn add_term(&mut self, name: String, coeff: BigRational) {
        if coeff.is_zero() {
            return;
        }
        match self.terms.entry(name) {
            Entry::Vacant(entry) => {
                entry.insert(coeff);
            }
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += coeff;
                if entry.get().is_zero() {
                    entry.remove();
                }
            }
        }
    }
}

impl From<BigRational> for Polynomial {
    fn from(value: BigRational) -> Self {
        Polynomial::constant(value)
    }
}

impl AddAssign<&Polynomial> for Polynomial {
    fn add_assign(&mut self, rhs: &Polynomial) {
        for (name, coeff) in &rhs.terms {
            self.add_term(name.clone(), coeff.clone());
        }
    }
}

impl SubAssign<&Polynomial> for Polynomial {
    fn sub_assign(&mut self, rhs: &Polynomial) {
        for (name, coeff) in &rhs.terms {
            self.add_term(name.clone(), -coeff);
        }
    }
}

impl Add<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(mut self, rhs: Polynomial) -> Polynomial {
        self += &rhs;
        self
    }
}

impl Sub<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(mut self, rhs: Polynomial) -> Polynomial {
        self -= &rhs;
        self
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.scaled(&-BigRational::one())
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.scaled(&-BigRational::one())
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let constant = self.terms.get(CONSTANT);
        let vars = self.terms.iter().filter(|(k, _)| k.as_str() != CONSTANT);
        let mut first = true;
        for (name, coeff) in vars.map(|(k, v)| (Some(k), v)).chain(constant.map(|c| (None, c))) {
            let magnitude = coeff.abs();
            if first {
                if coeff.is_negative() {
                    write!(f, "-")?;
                }
            } else if coeff.is_negative() {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            first = false;
            match name {
                Some(name) if magnitude.is_one() => write!(f, "{}", name)?,
                Some(name) => write!(f, "{}*{}", magnitude, name)?,
                None => write!(f, "{}", magnitude)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{int, ratio};

    fn poly(terms: &[(&str, i64)]) -> Polynomial {
        terms
            .iter()
            .fold(Polynomial::zero(), |acc, (name, c)| acc + Polynomial::term(*name, int(*c)))
    }

    #[test]
    fn test_zero_terms_are_dropped() {
        let p = poly(&[("x", 1), ("y", 2)]) - poly(&[("x", 1)]);
        assert_eq!(p.variables().collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(p.coefficient("x"), int(0));
    }

    #[test]
    fn test_substitute_splits_variable() {
        let mut p = poly(&[("x", 3), ("", -2)]);
        p.substitute("x", &(Polynomial::var("x_pos") - Polynomial::var("x_neg")));
        assert_eq!(p.coefficient("x_pos"), int(3));
        assert_eq!(p.coefficient("x_neg"), int(-3));
        assert_eq!(p.coefficient("x"), int(0));
        assert_eq!(p.constant_term(), int(-2));
    }

    #[test]
    fn test_substitute_missing_variable_is_noop() {
        let mut p = poly(&[("x", 1)]);
        let before = p.clone();
        p.substitute("y", &Polynomial::var("z"));
        assert_eq!(p, before);
    }

    #[test]
    fn test_evaluate() {
        let p = poly(&[("x", 2), ("y", -1), ("", 5)]);
        let mut assignment = BTreeMap::new();
        assignment.insert("x".to_string(), int(3));
        assert_eq!(p.evaluate(&assignment), None);
        assignment.insert("y".to_string(), ratio(1, 2));
        assert_eq!(p.evaluate(&assignment), Some(ratio(21, 2)));
    }

    #[test]
    fn test_display() {
        assert_eq!(poly(&[("x", 2), ("y", -1), ("", 3)]).to_string(), "2*x - y + 3");
        assert_eq!(poly(&[("x", -1), ("", -4)]).to_string(), "-x - 4");
        assert_eq!(Polynomial::zero().to_string(), "0");
        assert_eq!(Polynomial::term("i", ratio(1, 2)).to_string(), "1/2*i");
    }
}
