// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Case conventions for suggested file stems

use serde::{Deserialize, Serialize};

/// Target case convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    #[default]
    Snake,
    Kebab,
    Camel,
    Pascal,
}

impl CaseStyle {
    /// Convert `input` to this case. Words are split on `_`, `-`,
    /// whitespace and camel-case boundaries, so the source case does not
    /// need to be known.
    pub fn apply(self, input: &str) -> String {
        let words = split_words(input);

        match self {
            CaseStyle::Snake => lower_words(&words).join("_"),
            CaseStyle::Kebab => lower_words(&words).join("-"),
            CaseStyle::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            CaseStyle::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
        }
    }
}

fn lower_words(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split an identifier-like string into words.
///
/// `HTTPServer2Log` splits as `HTTP`, `Server2`, `Log`; digits stay attached
/// to the word before them.
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_between_cases() {
        let cases = [
            ("my_variable_name", CaseStyle::Pascal, "MyVariableName"),
            ("my_variable_name", CaseStyle::Camel, "myVariableName"),
            ("my_variable_name", CaseStyle::Kebab, "my-variable-name"),
            ("my-variable-name", CaseStyle::Snake, "my_variable_name"),
            ("MyVariableName", CaseStyle::Snake, "my_variable_name"),
            ("MyVariableName", CaseStyle::Camel, "myVariableName"),
            ("myVariableName", CaseStyle::Kebab, "my-variable-name"),
            ("myVariableName", CaseStyle::Pascal, "MyVariableName"),
            ("test", CaseStyle::Pascal, "Test"),
            ("", CaseStyle::Pascal, ""),
        ];

        for (input, style, expected) in cases {
            assert_eq!(style.apply(input), expected, "{:?} -> {:?}", input, style);
        }
    }

    #[test]
    fn test_acronyms_and_digits() {
        assert_eq!(split_words("HTTPServer2Log"), vec!["HTTP", "Server2", "Log"]);
        assert_eq!(CaseStyle::Snake.apply("planQ1"), "plan_q1");
        assert_eq!(CaseStyle::Snake.apply("Q3_Budget  Review"), "q3_budget_review");
    }

    #[test]
    fn test_serde_names() {
        let style: CaseStyle = serde_json::from_str("\"pascal\"").unwrap();
        assert_eq!(style, CaseStyle::Pascal);
        assert_eq!(serde_json::to_string(&CaseStyle::Kebab).unwrap(), "\"kebab\"");
    }
}
