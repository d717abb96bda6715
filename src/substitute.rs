//! `${NAME}` placeholder expansion against a build environment.
//!
//! Unknown names are left in place verbatim, so `${NOT_SET}` survives into the
//! output unchanged. A placeholder can be written literally by doubling the
//! dollar sign: `$${NAME}` expands to `${NAME}`.

use std::collections::HashMap;

const OPEN: &str = "${";
const CLOSE: char = '}';
const ESCAPE: char = '$';

/// Replace every `${KEY}` in `template` with `vars[KEY]`.
pub fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    if !template.contains(OPEN) {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let (before, after) = rest.split_at(start);

        if let Some(literal) = before.strip_suffix(ESCAPE) {
            out.push_str(literal);
            out.push_str(OPEN);
            rest = &after[OPEN.len()..];
            continue;
        }

        out.push_str(before);
        let body = &after[OPEN.len()..];
        match body.find(CLOSE) {
            Some(end) => {
                let key = &body[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&after[..OPEN.len() + end + 1]),
                }
                rest = &body[end + 1..];
            }
            None => {
                // unterminated, keep the remainder as-is
                out.push_str(after);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
