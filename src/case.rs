//! Case conversions for schema names.
//!
//! Schema type names are camelCase on the wire (`widgetEntity`), and every
//! backend renders them differently:
//!
//! | Conversion | Example | Used for |
//! |------------|---------|----------|
//! | `pascal_case` | `widgetEntity` → `WidgetEntity` | proto messages, Rust types |
//! | `camel_case` | `Widget Entity` → `widgetEntity` | type names, GraphQL lookups |
//! | `snake_case` | `widgetEntity` → `widget_entity` | proto fields, Rust idents |
//! | `constant_case` | `widgetEntity` → `WIDGET_ENTITY` | proto enum variants |
//!
//! All four split words on case boundaries as well as on `_`, `-`, `.`,
//! and whitespace, so already-converted input passes through unchanged.

/// Split a name into lowercase words.
///
/// A word break occurs at any non-alphanumeric character, at a
/// lower-to-upper transition (`widgetEntity`), and before the final
/// capital of an acronym run (`HTTPServer` → `http`, `server`).
fn split_words(s: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
            continue;
        }
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if (prev_lower || (prev_upper && next_lower)) && !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().to_string() + chars.as_str(),
    }
}

/// Convert a name to PascalCase: `widgetEntity` → `WidgetEntity`.
pub fn pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

/// Convert a name to camelCase: `Widget Entity` → `widgetEntity`.
pub fn camel_case(s: &str) -> String {
    let words = split_words(s);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Convert a name to snake_case: `widgetEntity` → `widget_entity`.
pub fn snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// Convert a name to CONSTANT_CASE: `widgetEntity` → `WIDGET_ENTITY`.
pub fn constant_case(s: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_case_conversion() {
        assert_eq!(pascal_case("widgetEntity"), "WidgetEntity");
        assert_eq!(pascal_case("widget"), "Widget");
        assert_eq!(pascal_case("order_by_direction"), "OrderByDirection");
        assert_eq!(pascal_case("Widget Entity Event"), "WidgetEntityEvent");
    }

    #[test]
    fn pascal_case_is_idempotent() {
        assert_eq!(pascal_case("WidgetEntity"), "WidgetEntity");
        assert_eq!(pascal_case(""), "");
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("Widget Entity"), "widgetEntity");
        assert_eq!(camel_case("widgetEntity"), "widgetEntity");
        assert_eq!(camel_case("kubernetes_deployment"), "kubernetesDeployment");
        assert_eq!(camel_case("widget"), "widget");
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(snake_case("widgetEntity"), "widget_entity");
        assert_eq!(snake_case("orderByDirection"), "order_by_direction");
        assert_eq!(snake_case("pageSize"), "page_size");
        assert_eq!(snake_case("widget"), "widget");
    }

    #[test]
    fn constant_case_conversion() {
        assert_eq!(constant_case("widgetEntity"), "WIDGET_ENTITY");
        assert_eq!(constant_case("up"), "UP");
        assert_eq!(constant_case("notYetStarted"), "NOT_YET_STARTED");
    }

    #[test]
    fn acronym_runs_split_before_final_capital() {
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(pascal_case("HTTPServer"), "HttpServer");
    }

    #[test]
    fn digits_stay_attached_to_their_word() {
        assert_eq!(snake_case("eastUs2"), "east_us2");
        assert_eq!(pascal_case("eastUs2"), "EastUs2");
    }
}
