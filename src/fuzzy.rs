//! Bounded spelling-variant generation for approximate matching.
//!
//! A term expands into a small deterministic set: the term itself, its
//! singular/plural counterpart, and for longer terms every single-character
//! deletion and adjacent transposition. Variants are used for membership
//! testing only; no edit distance is computed against the corpus.

/// Terms shorter than this only get plural variants.
pub const EDIT_MIN_CHARS: usize = 5;

/// Variants shorter than this are discarded; they match too much.
pub const MIN_VARIANT_CHARS: usize = 4;

/// Hard cap on the expansion size, original included.
pub const MAX_VARIANTS: usize = 24;

/// Spelling variants of `term`, original first. With `fuzzy` off the result
/// is exactly `[term]`.
pub fn expand(term: &str, fuzzy: bool) -> Vec<String> {
    let mut variants = vec![term.to_string()];
    if !fuzzy || term.is_empty() {
        return variants;
    }

    let chars: Vec<char> = term.chars().collect();
    let mut candidates = plural_forms(term, &chars);

    if chars.len() >= EDIT_MIN_CHARS {
        for i in 0..chars.len() - 1 {
            if chars[i] != chars[i + 1] {
                let mut swapped = chars.clone();
                swapped.swap(i, i + 1);
                candidates.push(swapped.into_iter().collect());
            }
        }
        for i in 0..chars.len() {
            let dropped: String = chars
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, c)| *c)
                .collect();
            candidates.push(dropped);
        }
    }

    for candidate in candidates {
        if variants.len() >= MAX_VARIANTS {
            break;
        }
        if candidate.chars().count() >= MIN_VARIANT_CHARS && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Singular for plural-looking terms, plural otherwise.
fn plural_forms(term: &str, chars: &[char]) -> Vec<String> {
    let lower = term.to_lowercase();
    let stem = |n: usize| -> String { chars[..chars.len().saturating_sub(n)].iter().collect() };
    let mut forms = Vec::new();

    if lower.ends_with("ies") && chars.len() > 4 {
        forms.push(format!("{}y", stem(3)));
    } else if lower.ends_with("ss") {
        forms.push(format!("{term}es"));
    } else if lower.ends_with("es") {
        forms.push(stem(2));
        forms.push(stem(1));
    } else if lower.ends_with('s') {
        forms.push(stem(1));
    } else if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        forms.push(format!("{}ies", stem(1)));
    } else if ["x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        forms.push(format!("{term}es"));
    } else {
        forms.push(format!("{term}s"));
    }
    forms
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut rev = lower.chars().rev();
    rev.next();
    matches!(rev.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}
