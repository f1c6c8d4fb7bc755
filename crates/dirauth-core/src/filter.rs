use ldap3::ldap_escape;

/// Build the equality filter used to locate a user, e.g. `(uid=tesla)`.
///
/// The username is escaped per RFC 4515 so that `*`, parentheses and
/// backslashes match literally. The attribute is taken as configured.
pub fn user_filter(attribute: &str, username: &str) -> String {
    format!("({}={})", attribute, ldap_escape(username))
}

const MISSING_OPERATOR: &str = "Expected comparison operator (=, ~=, >=, <=) after attribute name";

/// Check a search filter against the RFC 4515 string grammar.
///
/// ```text
/// filter     = "(" ( "&" 1*filter / "|" 1*filter / "!" filter / item ) ")"
/// item       = attr ( "=" / "~=" / ">=" / "<=" ) value
/// ```
///
/// Errors carry a 1-based position into the trimmed filter.
pub fn validate_filter(filter: &str) -> Result<(), String> {
    let input = filter.trim().as_bytes();
    if input.is_empty() {
        return Err("Filter cannot be empty".to_string());
    }

    let end = parse_filter(input, 0)?;
    if end < input.len() {
        return Err(format!(
            "Unexpected characters after filter at position {}",
            end + 1
        ));
    }
    Ok(())
}

fn parse_filter(input: &[u8], pos: usize) -> Result<usize, String> {
    if input.get(pos) != Some(&b'(') {
        return Err(format!("Expected '(' at position {}", pos + 1));
    }

    let body = pos + 1;
    let end = match input.get(body) {
        None => {
            return Err(format!(
                "Unexpected end of filter after '(' at position {}",
                pos + 1
            ))
        }
        Some(&op @ (b'&' | b'|')) => parse_filter_list(input, body + 1, op as char)?,
        Some(b'!') => parse_filter(input, body + 1)?,
        Some(_) => parse_item(input, body)?,
    };

    match input.get(end) {
        Some(b')') => Ok(end + 1),
        _ => Err(format!("Expected ')' at position {}", end + 1)),
    }
}

fn parse_filter_list(input: &[u8], pos: usize, op: char) -> Result<usize, String> {
    if input.get(pos) != Some(&b'(') {
        return Err(format!(
            "Empty filter list in '{}' operator at position {}",
            op,
            pos + 1
        ));
    }
    let mut cur = pos;
    while input.get(cur) == Some(&b'(') {
        cur = parse_filter(input, cur)?;
    }
    Ok(cur)
}

/// `;` introduces attribute options, `:` extensible matching rules.
fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b';' | b':')
}

/// Returns the position of the byte that ends the item's value.
fn parse_item(input: &[u8], pos: usize) -> Result<usize, String> {
    let attr_len = input[pos..].iter().take_while(|&&b| is_attr_char(b)).count();
    if attr_len == 0 {
        return Err(format!(
            "Expected attribute name after '(' at position {}",
            pos + 1
        ));
    }

    let mut cur = pos + attr_len;
    cur += match &input[cur..] {
        [b'~' | b'>' | b'<', b'=', ..] => 2,
        [b'=', ..] => 1,
        _ => return Err(MISSING_OPERATOR.to_string()),
    };

    while let Some(&b) = input.get(cur) {
        match b {
            b')' => break,
            b'\\' if cur + 1 < input.len() => cur += 2,
            _ => cur += 1,
        }
    }
    Ok(cur)
}
