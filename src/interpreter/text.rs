//! Lexical helpers: logical lines, bracket-aware splitting, literals.

use std::sync::LazyLock;

use regex::Regex;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid name regex")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid number regex")
});

/// One logical statement and the physical line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// One-based line number.
    pub line: usize,
    /// Statement text without comment or terminator.
    pub text: String,
}

/// Split script text into logical statements.
///
/// `%` starts a comment outside quotes, a trailing `...` joins the next
/// physical line, and `;` outside quotes and brackets ends a statement.
pub fn logical_lines(script: &str) -> Vec<SourceLine> {
    let mut statements = Vec::new();
    let mut pending = String::new();
    let mut pending_line = 0;

    for (index, raw) in script.lines().enumerate() {
        let line_no = index + 1;
        let code = strip_comment(raw).trim_end();
        if pending.is_empty() {
            pending_line = line_no;
        }
        if let Some(head) = code.strip_suffix("...") {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(code);
        for piece in split_top_level(&pending, ';') {
            let piece = piece.trim();
            if !piece.is_empty() {
                statements.push(SourceLine {
                    line: pending_line,
                    text: piece.to_string(),
                });
            }
        }
        pending.clear();
    }

    let tail = pending.trim();
    if !tail.is_empty() {
        statements.push(SourceLine {
            line: pending_line,
            text: tail.to_string(),
        });
    }
    statements
}

/// Text before a `%` that is not inside quotes.
pub fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match (quote, ch) {
            (None, '%') => return &line[..i],
            (None, '\'' | '"') if opens_quote(line, i) => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    line
}

// A single quote after an identifier or closing bracket is a transpose
// operator, not the start of a string.
fn opens_quote(line: &str, index: usize) -> bool {
    if &line[index..index + 1] == "\"" {
        return true;
    }
    match line[..index].chars().last() {
        None => true,
        Some(prev) => !(prev.is_alphanumeric() || prev == '_' || prev == ')' || prev == ']'),
    }
}

/// Split on `sep` where it is not nested in brackets or quotes.
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;

    for (i, ch) in s.char_indices() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
                continue;
            }
            None if (ch == '\'' || ch == '"') && opens_quote(s, i) => {
                quote = Some(ch);
                current.push(ch);
                continue;
            }
            None => {}
        }
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if ch == sep && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

/// Items of a list body: comma separated, or whitespace separated when
/// there are no top-level commas.
pub fn split_list(s: &str) -> Vec<String> {
    let by_comma = split_top_level(s, ',');
    let items = if by_comma.len() > 1 {
        by_comma
    } else {
        split_top_level(s.trim(), ' ')
    };
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Check that brackets and quotes are balanced and correctly nested.
pub fn check_brackets(s: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' if opens_quote(s, i) => quote = Some(ch),
            '(' | '[' | '{' => stack.push(ch),
            ')' | ']' | '}' => {
                let open = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some(top) if top == open => {}
                    Some(top) => {
                        return Err(format!(
                            "Mismatched brackets: \"{}\" closed by \"{}\"",
                            top, ch
                        ))
                    }
                    None => return Err(format!("Unmatched closing \"{}\"", ch)),
                }
            }
            _ => {}
        }
    }
    if let Some(q) = quote {
        return Err(format!("Missing closing quote {}", q));
    }
    if let Some(open) = stack.pop() {
        return Err(format!("Unmatched opening \"{}\"", open));
    }
    Ok(())
}

/// Byte index of the top-level assignment `=`, ignoring relational
/// operators `==`, `~=`, `<=`, `>=` and `!=`.
pub fn find_assignment(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' if opens_quote(s, i) => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                let prev = if i > 0 { bytes[i - 1] } else { b' ' };
                let next = bytes.get(i + 1).copied().unwrap_or(b' ');
                if next != b'=' && !matches!(prev, b'=' | b'~' | b'<' | b'>' | b'!') {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `lhs = rhs` at the top-level assignment operator.
pub fn split_assignment(s: &str) -> Option<(&str, &str)> {
    find_assignment(s).map(|i| (s[..i].trim(), s[i + 1..].trim()))
}

/// First whitespace-delimited word and the trimmed remainder.
pub fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(|c: char| c.is_whitespace()) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

/// Remove one layer of matching single or double quotes.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 {
        let first = s.as_bytes()[0];
        let last = s.as_bytes()[s.len() - 1];
        if first == last && (first == b'\'' || first == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Whether the text is a single quoted literal.
///
/// `'a' + 'b'` is not: the body may not hold the outer quote character.
pub fn is_quoted(s: &str) -> bool {
    let s = s.trim();
    let inner = strip_quotes(s);
    s.len() >= 2 && inner.len() + 2 == s.len() && !inner.contains(&s[..1])
}

/// Whether `value` can be written back as a quoted literal.
pub fn is_quotable(value: &str) -> bool {
    !(value.contains('\'') && value.contains('"'))
}

/// Quote `value` for script text, using double quotes when it holds a
/// single quote.
pub fn quote(value: &str) -> String {
    if value.contains('\'') && !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        format!("'{}'", value)
    }
}

/// Whether `s` is a legal object name.
pub fn is_valid_name(s: &str) -> bool {
    NAME_RE.is_match(s)
}

/// Parse a plain numeric literal. Rejects `inf`, `nan` and expressions.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if NUMBER_RE.is_match(s) {
        s.parse::<f64>().ok()
    } else {
        None
    }
}

/// Split a dotted chain, keeping parenthesised groups intact.
pub fn split_dots(s: &str) -> Vec<String> {
    split_top_level(s, '.')
        .into_iter()
        .map(|p| p.trim().to_string())
        .collect()
}

/// Decompose `name(args)` into the name and the argument text.
///
/// The closing parenthesis must end the text and match the first opening
/// parenthesis.
pub fn split_call(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    let open = s.find('(')?;
    let close = find_matching(s, open)?;
    if close != s.len() - 1 {
        return None;
    }
    Some((s[..open].trim(), &s[open + 1..close]))
}

/// Index of the bracket closing the one at `open`.
pub fn find_matching(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let (o, c) = match bytes.get(open)? {
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        b'{' => (b'{', b'}'),
        _ => return None,
    };
    let mut depth = 0;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == o {
            depth += 1;
        } else if b == c {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Name and index texts of `A(i, j)`.
pub fn split_indexed(s: &str) -> Option<(&str, Vec<String>)> {
    let (name, args) = split_call(s)?;
    if !is_valid_name(name) {
        return None;
    }
    let indices = split_top_level(args, ',')
        .into_iter()
        .map(|a| a.trim().to_string())
        .collect();
    Some((name, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_lines_comments_and_continuations() {
        let script = "Create Spacecraft Sat1; % the spacecraft\nSat1.X = ...\n  7000;\n\nx = 'a;b'";
        let lines = logical_lines(script);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "Create Spacecraft Sat1");
        assert_eq!(lines[1].line, 2);
        assert_eq!(lines[1].text, "Sat1.X =    7000");
        assert_eq!(lines[2].text, "x = 'a;b'");
    }

    #[test]
    fn test_multiple_statements_on_one_line() {
        let lines = logical_lines("a = 1; b = 2");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].line, 1);
    }

    #[test]
    fn test_percent_inside_quotes_is_kept() {
        assert_eq!(strip_comment("s = '50%' % note"), "s = '50%' ");
    }

    #[test]
    fn test_find_assignment_skips_relational() {
        assert_eq!(find_assignment("x == 1"), None);
        assert_eq!(find_assignment("a <= b"), None);
        assert_eq!(split_assignment("x ~= y"), None);
        assert_eq!(split_assignment("A(1,2) = x"), Some(("A(1,2)", "x")));
        assert_eq!(split_assignment("Sat1.X = 7000"), Some(("Sat1.X", "7000")));
        assert_eq!(
            split_assignment("Propagate P(S) {S.ElapsedSecs = 60}"),
            None
        );
    }

    #[test]
    fn test_check_brackets() {
        assert!(check_brackets("F(a, [1 2], {x})").is_ok());
        assert!(check_brackets("F(a").is_err());
        assert!(check_brackets("F(a]").is_err());
        assert!(check_brackets("x)").is_err());
        assert!(check_brackets("s = 'open").is_err());
    }

    #[test]
    fn test_split_call_and_indexed() {
        assert_eq!(split_call("Burn1(Sat1, Sat2)"), Some(("Burn1", "Sat1, Sat2")));
        assert_eq!(split_call("F(a)(b)"), None);
        let (name, idx) = split_indexed("A(i, 2)").expect("indexed");
        assert_eq!(name, "A");
        assert_eq!(idx, vec!["i".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_numbers_and_names() {
        assert_eq!(parse_number("1e-3"), Some(0.001));
        assert_eq!(parse_number("-.5"), Some(-0.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1+2"), None);
        assert!(is_valid_name("Sat_1"));
        assert!(!is_valid_name("1Sat"));
        assert!(!is_valid_name("Sat.X"));
    }

    #[test]
    fn test_split_list_forms() {
        assert_eq!(split_list("Earth, Luna"), vec!["Earth", "Luna"]);
        assert_eq!(split_list("Sat1.X Sat1.Y"), vec!["Sat1.X", "Sat1.Y"]);
        assert_eq!(split_list("A(1, 2), x"), vec!["A(1, 2)", "x"]);
    }

    #[test]
    fn test_quoted_literal_is_a_single_string() {
        assert!(is_quoted("'abc'"));
        assert!(is_quoted("\"it's\""));
        assert!(!is_quoted("'a' + 'b'"));
        assert!(!is_quoted("\"a\" \"b\""));
        assert!(!is_quoted("'a"));
    }

    #[test]
    fn test_quote_picks_the_free_quote_character() {
        assert_eq!(quote("abc"), "'abc'");
        assert_eq!(quote("it's"), "\"it's\"");
        assert!(is_quotable("say \"hi\""));
        assert!(!is_quotable("it's \"odd\""));
        assert_eq!(strip_quotes(&quote("it's")), "it's");
    }

    #[test]
    fn test_transpose_quote_is_not_a_string() {
        assert!(check_brackets("B = A'").is_ok());
        assert_eq!(strip_comment("B = A' % c"), "B = A' ");
    }
}
