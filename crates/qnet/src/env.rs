use std::env;
use std::sync::OnceLock;

static QNET_PASS_STATS: OnceLock<bool> = OnceLock::new();
static QNET_STRICT_SCALES: OnceLock<bool> = OnceLock::new();
static QNET_DISABLED_PASSES: OnceLock<Vec<String>> = OnceLock::new();

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn bool_var(cell: &OnceLock<bool>, name: &str) -> bool {
    *cell.get_or_init(|| match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value),
        _ => false,
    })
}

pub(crate) fn pass_stats_enabled() -> bool {
    bool_var(&QNET_PASS_STATS, "QNET_PASS_STATS")
}

pub(crate) fn strict_scales_enabled() -> bool {
    bool_var(&QNET_STRICT_SCALES, "QNET_STRICT_SCALES")
}

pub(crate) fn disabled_passes() -> &'static [String] {
    QNET_DISABLED_PASSES.get_or_init(|| match env::var("QNET_DISABLED_PASSES") {
        Ok(value) => parse_list(&value),
        Err(_) => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_are_case_insensitive() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_bool(value), "{value} should enable");
        }
        for value in ["0", "false", "off", "maybe"] {
            assert!(!parse_bool(value), "{value} should disable");
        }
    }

    #[test]
    fn pass_list_skips_blank_entries() {
        assert_eq!(
            parse_list("a, ,b ,"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
