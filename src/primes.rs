//! Prime table sizing for the bucket array.
//!
//! Bucket counts are kept prime so that `hash % len` spreads keys whose
//! hashes share common factors. Small tables grow by roughly 1.2x through a
//! fixed table; beyond it sizes are found by trial division.

use crate::error::Error;

/// Largest table length handed out by [`expand_prime`].
pub const MAX_PRIME_ARRAY_LENGTH: i32 = 0x7FEF_FFFD;

/// Ascending table of bucket counts used before falling back to a scan.
pub const PRIMES: [i32; 72] = [
    3, 7, 11, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631,
    761, 919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103,
    12143, 14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631,
    130363, 156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403,
    968897, 1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559,
    5999471, 7199369,
];

// Sizes where `(p - 1) % 101 == 0` interact badly with some hash functions.
const HASH_PRIME: i32 = 101;

/// Trial-division primality test over odd divisors up to `sqrt(candidate)`.
pub fn is_prime(candidate: i32) -> bool {
    if candidate < 2 {
        return false;
    }
    if candidate & 1 == 0 {
        return candidate == 2;
    }
    let limit = (candidate as f64).sqrt() as i32;
    let mut divisor = 3;
    while divisor <= limit {
        if candidate % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Smallest usable bucket count that is `>= min`.
///
/// Returns `min` itself when no prime is found below `i32::MAX`.
pub fn get_prime(min: i32) -> Result<i32, Error> {
    if min < 0 {
        return Err(Error::NegativeSize(min));
    }
    if let Some(&prime) = PRIMES.iter().find(|&&p| p >= min) {
        return Ok(prime);
    }
    let mut candidate = min | 1;
    while candidate < i32::MAX {
        if is_prime(candidate) && (candidate - 1) % HASH_PRIME != 0 {
            return Ok(candidate);
        }
        candidate = match candidate.checked_add(2) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(min)
}

/// Bucket count to grow to from `old_size`: roughly double, capped at
/// [`MAX_PRIME_ARRAY_LENGTH`].
pub fn expand_prime(old_size: i32) -> Result<i32, Error> {
    let new_size = 2 * i64::from(old_size);
    if new_size > i64::from(MAX_PRIME_ARRAY_LENGTH) {
        if MAX_PRIME_ARRAY_LENGTH > old_size {
            return Ok(MAX_PRIME_ARRAY_LENGTH);
        }
        return Err(Error::CapacityOverflow {
            requested: new_size as usize,
        });
    }
    // new_size <= MAX_PRIME_ARRAY_LENGTH, so the narrowing is lossless.
    get_prime(new_size as i32)
}
