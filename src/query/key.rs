use crate::query::options::{Metrics, QueryOptions};
use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Namespace prepended to every cache key so report entries never collide with
/// unrelated users of the same cache store.
pub const CACHE_KEY_PREFIX: &str = "mallard-reports.";

/// Serialized as a JSON array in field order, which keeps the key sensitive to
/// argument position as well as content.
#[derive(Serialize)]
struct KeyTuple<'a>(&'a str, NaiveDate, NaiveDate, &'a Metrics, &'a QueryOptions);

/// Derive the cache key for a query.
///
/// Pure function of its arguments: SHA-256 over the JSON encoding of the
/// ordered argument tuple, hex encoded.
pub fn derive_cache_key(
    view_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    metrics: &Metrics,
    options: &QueryOptions,
) -> String {
    let tuple = KeyTuple(view_id, start_date, end_date, metrics, options);
    // Serializing strings, dates and a string-keyed map cannot fail.
    let encoded = serde_json::to_vec(&tuple).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    format!("{CACHE_KEY_PREFIX}{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_key() -> String {
        derive_cache_key(
            "12345",
            date(2024, 1, 1),
            date(2024, 1, 31),
            &Metrics::from("ga:sessions"),
            &QueryOptions::new().dimensions("ga:browser"),
        )
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(base_key(), base_key());
    }

    #[test]
    fn test_key_format() {
        let key = base_key();
        let digest = key.strip_prefix(CACHE_KEY_PREFIX).unwrap();
        assert_eq!(digest.len(), 64, "SHA-256 hex output is 64 chars");
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_each_field_changes_key() {
        let metrics = Metrics::from("ga:sessions");
        let options = QueryOptions::new().dimensions("ga:browser");
        let start = date(2024, 1, 1);
        let end = date(2024, 1, 31);
        let base = base_key();

        assert_ne!(base, derive_cache_key("54321", start, end, &metrics, &options));
        assert_ne!(
            base,
            derive_cache_key("12345", date(2024, 1, 2), end, &metrics, &options)
        );
        assert_ne!(
            base,
            derive_cache_key("12345", start, date(2024, 1, 30), &metrics, &options)
        );
        assert_ne!(
            base,
            derive_cache_key("12345", start, end, &Metrics::from("ga:users"), &options)
        );
        assert_ne!(
            base,
            derive_cache_key(
                "12345",
                start,
                end,
                &metrics,
                &options.clone().max_results(10)
            )
        );
    }

    #[test]
    fn test_swapped_dates_differ() {
        let metrics = Metrics::from("ga:sessions");
        let options = QueryOptions::new();
        let a = derive_cache_key("1", date(2024, 1, 1), date(2024, 1, 2), &metrics, &options);
        let b = derive_cache_key("1", date(2024, 1, 2), date(2024, 1, 1), &metrics, &options);
        assert_ne!(a, b);
    }

    #[test]
    fn test_option_value_type_matters() {
        let metrics = Metrics::from("ga:pageviews");
        let start = date(2024, 1, 1);
        let numeric = QueryOptions::new().with("max-results", 20_i64);
        let textual = QueryOptions::new().with("max-results", "20");
        assert_ne!(
            derive_cache_key("1", start, start, &metrics, &numeric),
            derive_cache_key("1", start, start, &metrics, &textual)
        );
    }
}
