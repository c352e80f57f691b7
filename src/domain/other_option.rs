// "Other" free-text answers for option fields
//
// A radio group, select or checkbox group with `allowOther` stores a
// free-text answer as `other:<text>`. Validation sees a plain string. An
// option whose own value starts with `other:` is indistinguishable from a
// free-text answer; that collision is a known limitation of the encoding.

use crate::domain::element::ElementOption;

pub const OTHER_PREFIX: &str = "other:";

/// Sentinel value posted by the "Other" radio / checkbox itself
pub const OTHER_MARKER: &str = "__other__";

pub fn encode(text: &str) -> String {
    format!("{}{}", OTHER_PREFIX, text)
}

/// Free text of an encoded answer, `None` for fixed option values
pub fn decode(value: &str) -> Option<&str> {
    value.strip_prefix(OTHER_PREFIX)
}

pub fn is_other(value: &str) -> bool {
    value.starts_with(OTHER_PREFIX)
}

/// Display label for a stored option value
pub fn resolve_label(value: &str, options: &[ElementOption]) -> String {
    if let Some(text) = decode(value) {
        return format!("Other: {}", text);
    }

    options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| value.to_string())
}

/// Fold a posted choice and its companion free-text input into a stored value
pub fn fold_choice(choice: &str, other_text: Option<&str>) -> String {
    if choice == OTHER_MARKER {
        encode(other_text.unwrap_or("").trim())
    } else {
        choice.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<ElementOption> {
        vec![
            ElementOption::new("Red", "red"),
            ElementOption::new("Blue", "blue"),
        ]
    }

    #[test]
    fn test_encode_decode() {
        let encoded = encode("Turquoise");
        assert_eq!(encoded, "other:Turquoise");
        assert_eq!(decode(&encoded), Some("Turquoise"));
        assert_eq!(decode("red"), None);
        assert!(is_other("other:"));
    }

    #[test]
    fn test_resolve_label() {
        assert_eq!(resolve_label("red", &options()), "Red");
        assert_eq!(resolve_label("other:Teal", &options()), "Other: Teal");
        assert_eq!(resolve_label("green", &options()), "green");
    }

    #[test]
    fn test_option_value_with_prefix_collides() {
        // a fixed option whose value carries the prefix decodes as free text
        let opts = vec![ElementOption::new("Other: preset", "other:preset")];
        assert_eq!(resolve_label("other:preset", &opts), "Other: preset");
        assert!(is_other(&opts[0].value));
    }

    #[test]
    fn test_fold_choice() {
        assert_eq!(fold_choice("red", Some("ignored")), "red");
        assert_eq!(fold_choice(OTHER_MARKER, Some("  Teal ")), "other:Teal");
        assert_eq!(fold_choice(OTHER_MARKER, None), "other:");
    }
}
