//! Balanced Scanner
//!
//! Finds where a structured value that starts at an opening brace ends.
//! Object and array nesting are counted independently, and string literals
//! (single or double quoted, with backslash escapes) are skipped.
//!
//! When the value never balances, the scanner also reports every point where
//! a complete value ended, together with the delimiters still open there.
//! Closing those delimiters gives a "balanced-so-far" candidate.

/// A position inside an unbalanced value where a complete value just ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletePoint {
    /// Byte offset just past the complete value
    pub end: usize,
    /// Closing delimiters needed, innermost first
    pub closers: String,
}

/// Result of scanning from an opening brace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// All counters returned to zero; byte offset just past the value
    Balanced(usize),
    /// Text ended first; complete points in order of appearance
    Unbalanced(Vec<CompletePoint>),
}

/// Scan `text` starting at byte offset `start`.
pub fn scan(text: &str, start: usize) -> ScanOutcome {
    let mut braces: i32 = 0;
    let mut brackets: i32 = 0;
    let mut open: Vec<char> = Vec::new();
    let mut points = Vec::new();

    let mut in_string: Option<char> = None;
    let mut escaped = false;

    let body = &text[start..];
    let mut iter = body.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        let pos = start + i;

        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
                points.push(point(pos + c.len_utf8(), &open));
            }
            continue;
        }

        let scalar_char = c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
        if scalar_char {
            let next_is_scalar = iter.peek().map_or(false, |(_, n)| {
                n.is_ascii_alphanumeric() || matches!(n, '.' | '-' | '+' | '_')
            });
            if !next_is_scalar {
                points.push(point(pos + c.len_utf8(), &open));
            }
            continue;
        }

        // Comments may hold stray quotes or braces
        let next = iter.peek().map(|(_, n)| *n);
        if c == '#' || (c == '/' && next == Some('/')) {
            while iter.peek().map_or(false, |(_, n)| *n != '\n') {
                iter.next();
            }
            continue;
        }
        if c == '/' && next == Some('*') {
            iter.next();
            let mut prev = '\0';
            for (_, n) in iter.by_ref() {
                if prev == '*' && n == '/' {
                    break;
                }
                prev = n;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '{' => {
                braces += 1;
                open.push('{');
            }
            '[' => {
                brackets += 1;
                open.push('[');
            }
            '}' | ']' => {
                if c == '}' {
                    braces -= 1;
                } else {
                    brackets -= 1;
                }
                let opener = if c == '}' { '{' } else { '[' };
                if open.last() == Some(&opener) {
                    open.pop();
                }
                if braces <= 0 && brackets <= 0 {
                    return ScanOutcome::Balanced(pos + 1);
                }
                points.push(point(pos + 1, &open));
            }
            _ => {}
        }
    }

    ScanOutcome::Unbalanced(points)
}

fn point(end: usize, open: &[char]) -> CompletePoint {
    let closers = open
        .iter()
        .rev()
        .map(|c| if *c == '{' { '}' } else { ']' })
        .collect();
    CompletePoint { end, closers }
}

/// Balanced-so-far candidates for an unbalanced scan, largest first.
pub fn prefix_candidates(text: &str, start: usize, points: &[CompletePoint]) -> Vec<String> {
    points
        .iter()
        .rev()
        .filter(|p| !p.closers.is_empty())
        .map(|p| {
            let mut candidate = text[start..p.end].to_string();
            candidate.push_str(&p.closers);
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_object() {
        let text = "prefix {\"a\": {\"b\": [1, 2]}} suffix";
        let start = text.find('{').unwrap();
        match scan(text, start) {
            ScanOutcome::Balanced(end) => assert_eq!(&text[start..end], "{\"a\": {\"b\": [1, 2]}}"),
            other => panic!("expected balanced, got {:?}", other),
        }
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"a": "}{", 'b': 'it\'s }'} tail"#;
        match scan(text, 0) {
            ScanOutcome::Balanced(end) => assert_eq!(&text[end..], " tail"),
            other => panic!("expected balanced, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_skipped() {
        let text = "{\n  // don't stop at }\n  \"a\": 1 /* it's { fine */\n} tail";
        match scan(text, 0) {
            ScanOutcome::Balanced(end) => assert_eq!(&text[end..], " tail"),
            other => panic!("expected balanced, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_candidates() {
        let text = r#"{"phase": "planning", "plan": {"actionType": "CREATE"}, "analysis": "trunc"#;
        let points = match scan(text, 0) {
            ScanOutcome::Unbalanced(points) => points,
            other => panic!("expected unbalanced, got {:?}", other),
        };
        let candidates = prefix_candidates(text, 0, &points);
        // Largest first: the dangling "analysis" key, then the closed plan object
        assert_eq!(
            candidates[0],
            r#"{"phase": "planning", "plan": {"actionType": "CREATE"}, "analysis"}"#
        );
        assert_eq!(
            candidates[1],
            r#"{"phase": "planning", "plan": {"actionType": "CREATE"}}"#
        );
    }

    #[test]
    fn test_scalar_points() {
        let text = "{\"n\": 12, \"ok\": true";
        let points = match scan(text, 0) {
            ScanOutcome::Unbalanced(points) => points,
            other => panic!("expected unbalanced, got {:?}", other),
        };
        let last = points.last().unwrap();
        assert_eq!(&text[..last.end], "{\"n\": 12, \"ok\": true");
        assert_eq!(last.closers, "}");
    }
}
