//! Label Normalizer – turns raw recognizer identifiers into speakable phrases.
//!
//! `"golden_retriever-dog"` becomes `"Golden Retriever Dog"`: separators are
//! replaced with spaces, the string is lowercased, then every space-delimited
//! word gets a capital first letter. Applying [`normalize`] twice yields the
//! same result as applying it once.

/// Normalize a raw machine identifier into a title-cased phrase.
pub fn normalize(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let lowered = spaced.to_lowercase();

    lowered
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    let mut out = String::with_capacity(word.len());
    // Multi-char expansions ('ß' -> "SS") would not survive a second pass.
    match (upper.next(), upper.next()) {
        (Some(u), None) => out.push(u),
        _ => out.push(first),
    }
    out.extend(chars);
    out
}
