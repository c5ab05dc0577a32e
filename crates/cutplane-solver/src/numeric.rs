use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::One;

/// Builds an integral rational.
pub fn int(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

/// Builds `numer / denom` in lowest terms. Panics if `denom` is zero.
pub fn ratio(numer: i64, denom: i64) -> BigRational {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

/// `value - floor(value)`, always in `[0, 1)`.
///
/// `Ratio::fract` truncates toward zero and goes negative for negative
/// inputs; Gomory cuts need the floor-based definition.
pub fn fractional_part(value: &BigRational) -> BigRational {
    value - value.floor()
}

pub fn is_integral(value: &BigRational) -> bool {
    value.is_integer()
}

/// Least common multiple of the denominators of `values` (1 for an empty input).
pub fn denominator_lcm<'a>(values: impl IntoIterator<Item = &'a BigRational>) -> BigInt {
    values
        .into_iter()
        .fold(BigInt::one(), |acc, v| acc.lcm(v.denom()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_part_positive() {
        assert_eq!(fractional_part(&ratio(7, 3)), ratio(1, 3));
        assert_eq!(fractional_part(&int(4)), int(0));
    }

    #[test]
    fn test_fractional_part_negative() {
        // floor(-7/3) = -3
        assert_eq!(fractional_part(&ratio(-7, 3)), ratio(2, 3));
        assert_eq!(fractional_part(&ratio(-1, 2)), ratio(1, 2));
    }

    #[test]
    fn test_is_integral() {
        assert!(is_integral(&int(-5)));
        assert!(is_integral(&ratio(6, 3)));
        assert!(!is_integral(&ratio(5, 3)));
    }

    #[test]
    fn test_denominator_lcm() {
        let values = vec![ratio(1, 4), ratio(5, 6), int(3)];
        assert_eq!(denominator_lcm(&values), BigInt::from(12));
        assert_eq!(denominator_lcm(std::iter::empty()), BigInt::from(1));
    }
}
