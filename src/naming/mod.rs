// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turning raw model output into a safe file name
//!
//! A suggestion goes through a fixed sequence:
//!
//! 1. [`refine`] strips reasoning tags, code fences, quotes and whitespace
//! 2. [`validate_file_name`] checks the refined text
//! 3. [`fix_extension`] forces the original file's extension
//! 4. [`CaseStyle::apply`] converts the stem to the configured case
//! 5. the final name is validated again
//!
//! [`finalize_suggestion`] runs all five steps.

pub mod case;
pub mod validation;

pub use case::CaseStyle;
pub use validation::{
    is_valid_file_name, split_extension, validate_file_name, NameRejection, MAX_NAME_LENGTH,
};

use std::path::{Path, PathBuf};

/// Strip everything that is not part of the name from a raw response
pub fn refine(raw: &str) -> String {
    let without_think = remove_think_blocks(raw);

    let mut kept = String::with_capacity(without_think.len());
    for line in without_think.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("```") {
            // fence line, possibly carrying a language tag
            if rest.chars().all(|c| c.is_ascii_alphanumeric()) {
                continue;
            }
        }
        kept.push_str(line);
        kept.push('\n');
    }

    let name = kept.replace("```plaintext", "").replace('`', "");
    let name: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    name.trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn remove_think_blocks(s: &str) -> String {
    const START: &str = "<think>";
    const END: &str = "</think>";

    let mut result = s.to_string();
    while let Some(start) = result.find(START) {
        match result[start..].find(END) {
            Some(end) => result.replace_range(start..start + end + END.len(), ""),
            None => break,
        }
    }
    result
}

/// Give `suggested` the extension of `original`: appended when missing,
/// replaced when different, removed when the original has none.
pub fn fix_extension(suggested: &str, original: &str) -> String {
    let (stem, _) = split_extension(suggested);
    match split_extension(original).1 {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

/// Run the full refine → validate → extension → case → validate sequence
pub fn finalize_suggestion(
    raw: &str,
    original_name: &str,
    case: CaseStyle,
) -> Result<String, NameRejection> {
    let require_extension = split_extension(original_name).1.is_some();

    let refined = refine(raw);
    validate_file_name(&refined, require_extension)?;

    let corrected = fix_extension(&refined, original_name);
    let (stem, ext) = split_extension(&corrected);
    let stem: String = case.apply(stem).chars().filter(|c| !c.is_whitespace()).collect();

    let name = match ext {
        Some(ext) if require_extension => format!("{}.{}", stem, ext),
        _ => stem,
    };

    validate_file_name(&name, require_extension)?;
    Ok(name)
}

/// `notes.txt` with counter 2 becomes `notes_2.txt`. The stem is cut short
/// when the result would exceed [`MAX_NAME_LENGTH`] bytes.
pub fn numbered_name(name: &str, counter: u32) -> String {
    let (stem, ext) = split_extension(name);
    let tail = match ext {
        Some(ext) => format!("_{}.{}", counter, ext),
        None => format!("_{}", counter),
    };

    let budget = MAX_NAME_LENGTH.saturating_sub(tail.len());
    let mut cut = stem.len().min(budget);
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], tail)
}

/// First path in the sequence `target`, `stem_1.ext`, `stem_2.ext`, ...
/// for which `taken` returns false
pub fn unique_path(target: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(target) {
        return target.to_path_buf();
    }

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1;
    loop {
        let candidate = parent.join(numbered_name(&name, counter));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_refine() {
        let cases = [
            ("hello world\ntest", "helloworldtest"),
            ("```test```", "test"),
            ("```plaintext hello```", "hello"),
            ("", ""),
            ("```code```here```test```", "codeheretest"),
            ("```plaintext\nHello World\n```", "HelloWorld"),
            ("`equation_symbols.png`", "equation_symbols.png"),
            ("```text\nbudget_2024.xlsx\n```", "budget_2024.xlsx"),
            ("\"quoted_name.txt\"", "quoted_name.txt"),
            ("<think>the file is about cats</think>\ncats.jpg", "cats.jpg"),
        ];

        for (input, expected) in cases {
            assert_eq!(refine(input), expected, "refine({:?})", input);
        }
    }

    #[test]
    fn test_fix_extension() {
        assert_eq!(fix_extension("test", "file.txt"), "test.txt");
        assert_eq!(fix_extension("test.txt", "file.txt"), "test.txt");
        assert_eq!(fix_extension("test.md", "file.txt"), "test.txt");
        assert_eq!(fix_extension("build.sh", "Makefile"), "build");
        assert_eq!(fix_extension("photo.JPG", "img.jpeg"), "photo.jpeg");
    }

    #[test]
    fn test_finalize_plan_q1() {
        let name = finalize_suggestion("plan Q1.txt", "report.pdf", CaseStyle::Snake).unwrap();
        assert_eq!(name, "plan_q1.pdf");

        let kebab = finalize_suggestion("plan Q1.txt", "report.pdf", CaseStyle::Kebab).unwrap();
        assert_eq!(kebab, "plan-q1.pdf");

        let pascal = finalize_suggestion("plan Q1.txt", "report.pdf", CaseStyle::Pascal).unwrap();
        assert_eq!(pascal, "PlanQ1.pdf");
    }

    #[test]
    fn test_finalize_rejections() {
        assert_eq!(
            finalize_suggestion("", "report.pdf", CaseStyle::Snake),
            Err(NameRejection::Empty)
        );
        assert_eq!(
            finalize_suggestion("quarterly_report", "report.pdf", CaseStyle::Snake),
            Err(NameRejection::MissingExtension)
        );
        assert_eq!(
            finalize_suggestion("a|b.pdf", "report.pdf", CaseStyle::Snake),
            Err(NameRejection::IllegalCharacter('|'))
        );
        // case conversion leaves nothing of the stem
        assert_eq!(
            finalize_suggestion("___.pdf", "report.pdf", CaseStyle::Snake),
            Err(NameRejection::LeadingOrTrailing)
        );
    }

    #[test]
    fn test_finalize_without_original_extension() {
        let name = finalize_suggestion("BuildScript.sh", "Makefile", CaseStyle::Snake).unwrap();
        assert_eq!(name, "build_script");
    }

    #[test]
    fn test_finalized_names_always_validate() {
        let raws = ["```\nMy Report.docx\n```", "<think>x</think>a-b-c.pdf", "UPPER_case.PDF"];
        for raw in raws {
            if let Ok(name) = finalize_suggestion(raw, "source.pdf", CaseStyle::Camel) {
                assert!(is_valid_file_name(&name), "{:?} produced {:?}", raw, name);
                assert!(name.ends_with(".pdf"));
            }
        }
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("test.txt", 1), "test_1.txt");
        assert_eq!(numbered_name("test", 2), "test_2");
        assert_eq!(numbered_name("archive.tar.gz", 3), "archive.tar_3.gz");
    }

    #[test]
    fn test_numbered_name_stays_within_limit() {
        let longest = format!("{}.txt", "a".repeat(MAX_NAME_LENGTH - 4));
        assert!(is_valid_file_name(&longest));

        let first = numbered_name(&longest, 1);
        assert_eq!(first.len(), MAX_NAME_LENGTH);
        assert!(first.ends_with("a_1.txt"));
        assert!(is_valid_file_name(&first));

        let wide = numbered_name(&longest, 123);
        assert_eq!(wide.len(), MAX_NAME_LENGTH);
        assert!(wide.ends_with("_123.txt"));

        // multi-byte stems are cut on a character boundary
        let accented = format!("{}.md", "é".repeat(200));
        let numbered = numbered_name(&accented, 7);
        assert!(numbered.len() <= MAX_NAME_LENGTH);
        assert!(numbered.ends_with("é_7.md"));
    }

    #[test]
    fn test_unique_path_escalates_counter() {
        let mut taken: HashSet<PathBuf> = HashSet::new();
        let target = PathBuf::from("/out/notes.txt");

        let first = unique_path(&target, |p| taken.contains(p));
        assert_eq!(first, target);
        taken.insert(first);

        let second = unique_path(&target, |p| taken.contains(p));
        assert_eq!(second, PathBuf::from("/out/notes_1.txt"));
        taken.insert(second);

        let third = unique_path(&target, |p| taken.contains(p));
        assert_eq!(third, PathBuf::from("/out/notes_2.txt"));
        assert!(!taken.contains(&third));
    }
}
