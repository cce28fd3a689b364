//! Normalization of model output text.

/// Strip surrounding blank lines and the indentation shared by all lines.
///
/// Blank lines don't count towards the shared indentation. Models often
/// answer with an indented block, e.g. `"\n    {\"1\": \"a\"}\n  "`.
pub fn trim_indent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| match l.char_indices().nth(indent) {
            Some((i, _)) if !l.trim().is_empty() => &l[i..],
            _ => "",
        })
        .collect::<Vec<_>>()
        .join("\n")
}
