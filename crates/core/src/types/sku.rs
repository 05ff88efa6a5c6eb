//! SKU generation from product names.

/// Maximum SKU length.
pub const MAX_SKU_LENGTH: usize = 12;

/// SKU used when a name has no usable characters.
const FALLBACK_SKU: &str = "PROD";

/// Generate a SKU from a product name.
///
/// The base SKU is the name uppercased with everything except ASCII letters
/// and digits removed, truncated to [`MAX_SKU_LENGTH`] characters, or
/// `PROD` when nothing is left. If the base is already taken, a numeric
/// suffix starting at 1 is appended, trimming the base so the result never
/// exceeds the maximum length.
///
/// ```
/// use emporium_core::generate_sku;
///
/// assert_eq!(generate_sku("Wireless Headphones", &[]), "WIRELESSHEAD");
/// assert_eq!(generate_sku("T-Shirt", &["TSHIRT".to_string()]), "TSHIRT1");
/// assert_eq!(generate_sku("!!!", &[]), "PROD");
/// ```
#[must_use]
pub fn generate_sku(name: &str, existing: &[String]) -> String {
    let mut base: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(MAX_SKU_LENGTH)
        .collect();

    if base.is_empty() {
        base = FALLBACK_SKU.to_string();
    }

    let taken = |candidate: &str| existing.iter().any(|sku| sku == candidate);
    if !taken(&base) {
        return base;
    }

    let mut counter: u32 = 1;
    loop {
        let suffix = counter.to_string();
        let keep = MAX_SKU_LENGTH.saturating_sub(suffix.len()).min(base.len());
        let candidate = format!("{}{suffix}", base.get(..keep).unwrap_or(&base));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skus(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_strips_and_uppercases() {
        assert_eq!(generate_sku("Smart Watch v2", &[]), "SMARTWATCHV2");
        assert_eq!(generate_sku("café au lait", &[]), "CAFAULAIT");
    }

    #[test]
    fn test_truncates_long_names() {
        let sku = generate_sku("Ultra Premium Noise Cancelling Headphones", &[]);
        assert_eq!(sku, "ULTRAPREMIUM");
        assert_eq!(sku.len(), MAX_SKU_LENGTH);
    }

    #[test]
    fn test_falls_back_when_empty() {
        assert_eq!(generate_sku("", &[]), "PROD");
        assert_eq!(generate_sku("---", &skus(&["PROD"])), "PROD1");
    }

    #[test]
    fn test_counter_skips_taken_suffixes() {
        let existing = skus(&["MUG", "MUG1", "MUG2"]);
        assert_eq!(generate_sku("Mug", &existing), "MUG3");
    }

    #[test]
    fn test_suffix_respects_max_length() {
        let existing = skus(&["ULTRAPREMIUM"]);
        assert_eq!(generate_sku("Ultra Premium Bag", &existing), "ULTRAPREMIU1");

        let mut existing = skus(&["ULTRAPREMIUM"]);
        existing.extend((1..=9).map(|n| format!("ULTRAPREMIU{n}")));
        assert_eq!(generate_sku("Ultra Premium Bag", &existing), "ULTRAPREMI10");
    }

    proptest::proptest! {
        #[test]
        fn prop_sku_is_short_uppercase_and_fresh(
            name in ".{0,40}",
            taken in proptest::collection::vec("[A-Z0-9]{1,12}", 0..8),
        ) {
            let sku = generate_sku(&name, &taken);
            proptest::prop_assert!(!sku.is_empty());
            proptest::prop_assert!(sku.len() <= MAX_SKU_LENGTH);
            proptest::prop_assert!(sku.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            proptest::prop_assert!(!taken.contains(&sku));
        }
    }
}
