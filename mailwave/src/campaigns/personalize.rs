//! Template personalization
//!
//! Plain placeholder substitution, not a templating language: `{{name}}`
//! is replaced by the recipient attribute `name`, `{{custom.<key>}}` by the
//! recipient's custom field `<key>`. Nothing is evaluated, unresolved
//! placeholders stay verbatim, and rendering never fails.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*\}\}").expect("valid regex"));

/// Substitute `{{placeholder}}` occurrences with attribute values
///
/// Pure: no side effects, deterministic for a given template and attribute
/// map. Placeholders without a matching attribute are left exactly as
/// written.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use mailwave::campaigns::render;
///
/// let mut attrs = HashMap::new();
/// attrs.insert("first_name".to_string(), "Ann".to_string());
///
/// assert_eq!(render("Hi {{first_name}}", &attrs), "Hi Ann");
/// assert_eq!(render("Hi {{nickname}}", &attrs), "Hi {{nickname}}");
/// ```
#[must_use]
pub fn render(template: &str, attributes: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            attributes
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
