//! The `prime_checking` tool.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::ToolSpec;

pub const TOOL_NAME: &str = "prime_checking";
pub const TOOL_DESCRIPTION: &str =
    "Check if numbers in a list are prime using efficient mathematical algorithms";

const NO_PRIMES: &str = "No prime numbers found.";
const PRIMES_SUFFIX: &str = " are prime numbers.";

#[derive(Debug, Deserialize)]
struct PrimeCheckArgs {
    nums: Vec<i64>,
}

/// Trial division up to `floor(sqrt(n))`.
pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }

    let mut divisor = 2_i64;
    // `divisor <= n / divisor` stays in range where `divisor * divisor` would overflow.
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}

/// Returns a sentence listing the primes in `nums`, in input order and with
/// duplicates kept. The suffix is always plural.
pub fn check(nums: &[i64]) -> String {
    let primes = nums
        .iter()
        .copied()
        .filter(|n| is_prime(*n))
        .map(|n| n.to_string())
        .collect::<Vec<_>>();

    if primes.is_empty() {
        return NO_PRIMES.to_string();
    }

    format!("{}{PRIMES_SUFFIX}", primes.join(", "))
}

pub fn prime_checking_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nums": {
                "type": "array",
                "items": {"type": "integer"},
                "description": "A list of integers to check for primality. Always pass integers, never strings."
            }
        },
        "required": ["nums"],
        "additionalProperties": false
    })
}

pub fn prime_checking_tool() -> Result<ToolSpec, ToolError> {
    let tool = ToolSpec::new(TOOL_NAME, TOOL_DESCRIPTION)
        .with_schema(prime_checking_schema())?
        .with_handler(|args| async move {
            let args = serde_json::from_value::<PrimeCheckArgs>(args).map_err(|err| {
                ToolError::InvalidArguments {
                    tool: TOOL_NAME.to_string(),
                    message: err.to_string(),
                }
            })?;
            // Large primes take seconds of trial division.
            tokio::task::spawn_blocking(move || check(&args.nums))
                .await
                .map_err(|err| ToolError::Execution(err.to_string()))
        });
    Ok(tool)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn is_prime_matches_definition() {
        let cases = [
            (-7, false),
            (-1, false),
            (0, false),
            (1, false),
            (2, true),
            (3, true),
            (4, false),
            (9, false),
            (17, true),
            (25, false),
            (49, false),
            (97, true),
            (100, false),
            (7919, true),
            (2_147_483_647, true),
            (i64::MIN, false),
        ];

        for (input, expected) in cases {
            assert_eq!(is_prime(input), expected, "is_prime({input})");
        }
    }

    #[test]
    fn is_prime_agrees_with_naive_divisor_search() {
        for n in -20_i64..2_000 {
            let naive = n > 1 && (2..n).all(|d| n % d != 0);
            assert_eq!(is_prime(n), naive, "n = {n}");
        }
    }

    #[test]
    fn large_values_stay_in_range() {
        assert!(is_prime(1_000_000_007));
        assert!(!is_prime(i64::MAX));
        assert!(!is_prime(1_000_000_007 * 3));
    }

    #[test]
    fn check_formats_results() {
        assert_eq!(check(&[]), "No prime numbers found.");
        assert_eq!(check(&[4, 6, 8]), "No prime numbers found.");
        assert_eq!(check(&[2, 4, 5, 9]), "2, 5 are prime numbers.");
        assert_eq!(check(&[2, 3, 7]), "2, 3, 7 are prime numbers.");
    }

    #[test]
    fn check_keeps_plural_for_single_prime() {
        assert_eq!(check(&[2]), "2 are prime numbers.");
    }

    #[test]
    fn check_preserves_order_and_duplicates() {
        assert_eq!(check(&[7, -3, 2, 7, 1, 0]), "7, 2, 7 are prime numbers.");
        assert_eq!(check(&[13, 11, 10, 5]), "13, 11, 5 are prime numbers.");
    }

    #[test]
    fn check_is_idempotent() {
        let input = [29, 30, 31];
        assert_eq!(check(&input), check(&input));
    }

    #[tokio::test]
    async fn tool_checks_integer_list() {
        let tool = prime_checking_tool().expect("tool builds");
        assert_eq!(tool.name(), "prime_checking");
        assert_eq!(tool.json_schema()["required"][0], "nums");

        let output = tool
            .execute(json!({"nums": [2, 4, 5, 9]}))
            .await
            .expect("tool executes");
        assert_eq!(output, "2, 5 are prime numbers.");
    }

    #[tokio::test]
    async fn tool_rejects_strings() {
        let tool = prime_checking_tool().expect("tool builds");

        let err = tool
            .execute(json!({"nums": ["2", "3"]}))
            .await
            .expect_err("strings rejected");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tool
            .execute(json!({"nums": "2, 3"}))
            .await
            .expect_err("string rejected");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn tool_rejects_integers_wider_than_i64() {
        let tool = prime_checking_tool().expect("tool builds");
        let err = tool
            .execute(json!({"nums": [u64::MAX]}))
            .await
            .expect_err("out of range");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn large_prime_does_not_stall_the_runtime() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = Arc::clone(&ticks);
            async move {
                let mut interval = tokio::time::interval(Duration::from_millis(1));
                loop {
                    interval.tick().await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let tool = prime_checking_tool().expect("tool builds");
        let output = tool
            .execute(json!({"nums": [1_000_000_000_000_037_i64]}))
            .await
            .expect("tool executes");
        let ticks_during = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert_eq!(output, "1000000000000037 are prime numbers.");
        assert!(ticks_during > 0, "runtime was blocked for the whole check");
    }
}
