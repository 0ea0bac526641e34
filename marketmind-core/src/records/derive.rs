//! Derivation rules for display metadata the store computes from a record's
//! slug/name rather than storing redundantly in YAML.

/// `<slug>` with a trailing `-analyst` stripped and remaining `-` turned to `_`.
///
/// `market-analyst` -> `market`, `china-fundamentals-analyst` -> `china_fundamentals`.
pub fn derive_internal_key(slug: &str) -> String {
    slug.strip_suffix("-analyst").unwrap_or(slug).replace('-', "_")
}

/// `<Title_Case_Key> Analyst`, e.g. `china_fundamentals` -> `China_Fundamentals Analyst`.
pub fn derive_node_label(internal_key: &str) -> String {
    let title = internal_key
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_");
    format!("{title} Analyst")
}

/// Keyword match against slug/name to pick a display icon. Unmatched analysts get a
/// generic icon rather than failing load.
pub fn derive_icon(slug: &str, name: &str) -> &'static str {
    let haystack = format!("{slug} {name}").to_lowercase();
    if haystack.contains("news") {
        "\u{1F4F0}" // 📰
    } else if haystack.contains("social") || haystack.contains("sentiment") {
        "\u{1F4AC}" // 💬
    } else if haystack.contains("fundamental") {
        "\u{1F4D8}" // 📘
    } else if haystack.contains("china") {
        "\u{1F1E8}\u{1F1F3}" // 🇨🇳
    } else if haystack.contains("market") {
        "\u{1F4CA}" // 📊
    } else {
        "\u{1F916}" // 🤖
    }
}

/// Coarse tool-category hint, used by the tool registry's allow-list defaults
/// when a record doesn't name one explicitly.
pub fn derive_tool_category(slug: &str, name: &str) -> &'static str {
    let haystack = format!("{slug} {name}").to_lowercase();
    if haystack.contains("news") {
        "news"
    } else if haystack.contains("social") || haystack.contains("sentiment") {
        "social"
    } else if haystack.contains("fundamental") {
        "fundamentals"
    } else {
        "market"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_key_strips_analyst_suffix_and_dashes() {
        assert_eq!(derive_internal_key("market-analyst"), "market");
        assert_eq!(
            derive_internal_key("china-fundamentals-analyst"),
            "china_fundamentals"
        );
    }

    #[test]
    fn internal_key_passthrough_without_suffix() {
        assert_eq!(derive_internal_key("custom-slug"), "custom_slug");
    }

    #[test]
    fn node_label_title_cases_each_segment() {
        assert_eq!(derive_node_label("china_fundamentals"), "China_Fundamentals Analyst");
        assert_eq!(derive_node_label("market"), "Market Analyst");
    }

    #[test]
    fn icon_matches_known_keywords() {
        assert_eq!(derive_icon("news-analyst", "News Analyst"), "\u{1F4F0}");
        assert_eq!(derive_icon("market-analyst", "Market Analyst"), "\u{1F4CA}");
        assert_eq!(derive_icon("custom-analyst", "Custom Analyst"), "\u{1F916}");
    }

    #[test]
    fn tool_category_falls_back_to_market() {
        assert_eq!(derive_tool_category("custom-analyst", "Custom"), "market");
        assert_eq!(derive_tool_category("fundamentals-analyst", "Fundamentals"), "fundamentals");
    }
}
