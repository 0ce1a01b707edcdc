//! Placeholder translation between the canonical `?` style and PostgreSQL's
//! numbered `$n` style.

/// Rewrite every `?` outside quoted literals, quoted identifiers and
/// comments into `$1`, `$2`, … in order of appearance.
pub fn to_numbered(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut index = 0;

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                // Doubled quotes inside a literal reopen it on the next pass
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(c);
                if let Some(star) = chars.next() {
                    out.push(star);
                }
                // PostgreSQL block comments nest
                let mut depth = 1;
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    out.push(inner);
                    match (prev, inner) {
                        ('/', '*') => {
                            depth += 1;
                            prev = '\0';
                            continue;
                        }
                        ('*', '/') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            prev = '\0';
                            continue;
                        }
                        _ => {}
                    }
                    prev = inner;
                }
            }
            '?' => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }

    out
}

/// Number of canonical placeholders in a statement
pub fn count(sql: &str) -> usize {
    to_numbered(sql).matches('$').count() - sql.matches('$').count()
}
