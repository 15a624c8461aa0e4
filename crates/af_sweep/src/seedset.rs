//! # Seed sets
//!
//! Three spellings: an inclusive range `a..b`, a comma list `1,5,9`, or a
//! bare count `n` meaning `1..=n`.

use af_types::{ForgeError, ForgeResult};

/// Parse a seed-set expression into an ordered seed list.
pub fn parse_seed_set(input: &str) -> ForgeResult<Vec<u64>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ForgeError::InvalidScenario("empty seed set".into()));
    }

    if let Some((lo, hi)) = input.split_once("..") {
        let lo: u64 = parse_seed(lo)?;
        let hi: u64 = parse_seed(hi)?;
        if lo > hi {
            return Err(ForgeError::InvalidScenario(format!(
                "seed range {}..{} is inverted",
                lo, hi
            )));
        }
        return Ok((lo..=hi).collect());
    }

    if input.contains(',') {
        return input.split(',').map(parse_seed).collect();
    }

    let count = parse_seed(input)?;
    if count == 0 {
        return Err(ForgeError::InvalidScenario(
            "seed count must be >= 1".into(),
        ));
    }
    Ok((1..=count).collect())
}

fn parse_seed(raw: &str) -> ForgeResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ForgeError::InvalidScenario(format!("bad seed \"{}\": {}", raw.trim(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        assert_eq!(parse_seed_set("1..5").unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(parse_seed_set("7..7").unwrap(), vec![7]);
    }

    #[test]
    fn comma_list_preserves_order() {
        assert_eq!(parse_seed_set("9, 3,12").unwrap(), vec![9, 3, 12]);
    }

    #[test]
    fn bare_count_starts_at_one() {
        assert_eq!(parse_seed_set("3").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_seed_set("").is_err());
        assert!(parse_seed_set("5..1").is_err());
        assert!(parse_seed_set("0").is_err());
        assert!(parse_seed_set("a..b").is_err());
    }
}
