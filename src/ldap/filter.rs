//! Search filter rendering.

/// Placeholder replaced by the escaped username.
pub const USERNAME_PLACEHOLDER: &str = "{username}";

/// Escape filter metacharacters (RFC 4515) so user input can only ever be
/// an assertion value.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '*' => out.push_str(r"\2a"),
            '(' => out.push_str(r"\28"),
            ')' => out.push_str(r"\29"),
            '\\' => out.push_str(r"\5c"),
            '\0' => out.push_str(r"\00"),
            c => out.push(c),
        }
    }
    out
}

/// Substitute `{username}` in `template` with the escaped `username`.
///
/// Any other `{...}` sequence is left as literal text.
pub fn render(template: &str, username: &str) -> String {
    template.replace(USERNAME_PLACEHOLDER, &escape(username))
}
