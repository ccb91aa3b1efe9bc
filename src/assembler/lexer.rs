//! Line formatting and literal handling for LC-3 source text.
//!
//! Everything in here is pure: the passes call these helpers on each
//! line and never keep lexer state between lines.
use once_cell::sync::Lazy;
use regex::Regex;

/// Width of a machine word in bits.
pub const WORD_BITS: usize = 16;

static REGISTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^R([0-9]+)$").unwrap());
static LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());
static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"((?:[^"\\]|\\.)*)"$"#).unwrap());

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}

/// Strips spaces, tabs, line feeds, carriage returns, vertical tabs
/// and form feeds from both ends.
pub fn trim(s: &str) -> &str {
    s.trim_matches(is_blank)
}

/// Normalizes one line of source so the passes only ever see
/// uppercase, whitespace-delimited tokens.
///
/// Comments (`;` to end of line) are dropped, letters are uppercased and
/// runs of commas and whitespace become a single space. Text inside a
/// double-quoted literal is copied as written, so `.STRINGZ "a;b, c"`
/// keeps its payload intact.
pub fn format_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_string = false;
    let mut escaped = false;

    'mainloop: for c in trim(line).chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            ';' => break 'mainloop,
            '"' => {
                in_string = true;
                out.push(c);
            }
            // Commas and whitespace are token boundaries, nothing more.
            ',' | ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            _ => out.push(c.to_ascii_uppercase()),
        }
    }

    trim(&out).to_string()
}

/// Splits off the first whitespace-delimited token.
/// Returns the token and the trimmed remainder (possibly empty).
pub fn split_first(s: &str) -> (&str, &str) {
    let s = trim(s);
    match s.find(is_blank) {
        Some(idx) => (&s[..idx], trim(&s[idx..])),
        None => (s, ""),
    }
}

/// Parses a numeric literal.
///
/// Three forms are accepted:
///
/// ```nasm
/// x3000   ; hexadecimal, truncated to a signed 16-bit word (xFFFF is -1)
/// #-12    ; decimal
/// 42      ; bare decimal
/// ```
///
/// Returns `None` for empty or malformed input.
pub fn parse_number(s: &str) -> Option<i32> {
    let s = trim(s);
    let mut chars = s.chars();

    match chars.next()? {
        'x' | 'X' => {
            let digits = chars.as_str();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            u32::from_str_radix(digits, 16)
                .ok()
                .map(|val| val as u16 as i16 as i32)
        }
        '#' => chars.as_str().parse::<i32>().ok(),
        _ => s.parse::<i32>().ok(),
    }
}

/// Renders the low 16 bits of `n` as a binary string.
pub fn to_binary16(n: i32) -> String {
    format!("{:016b}", n as u16)
}

/// Regroups a binary string into hex digits, most significant nibble first.
/// Strings whose length is not a multiple of four are padded on the left.
pub fn to_hex(bin: &str) -> String {
    let pad = (4 - bin.len() % 4) % 4;
    let bits: Vec<bool> = std::iter::repeat(false)
        .take(pad)
        .chain(bin.bytes().map(|b| b == b'1'))
        .collect();

    bits.chunks(4)
        .map(|nibble| {
            let val = nibble.iter().fold(0u32, |acc, &bit| (acc << 1) | bit as u32);
            std::char::from_digit(val, 16).unwrap_or('0').to_ascii_uppercase()
        })
        .collect()
}

/// True if the token is written as a register (`R` followed by digits).
/// Whether the register actually exists is up to the caller.
pub fn is_register(token: &str) -> bool {
    REGISTER.is_match(token)
}

/// Returns the register number of an `R<digits>` token.
pub fn register_number(token: &str) -> Option<u32> {
    REGISTER
        .captures(token)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Label names are identifiers that cannot be mistaken for registers.
pub fn is_valid_label(token: &str) -> bool {
    LABEL.is_match(token) && !is_register(token)
}

/// Decodes a double-quoted `.STRINGZ` payload.
///
/// Supports the escapes `\n`, `\t`, `\r`, `\0`, `\\` and `\"`.
/// Returns `None` if the text is not exactly one well-formed literal.
pub fn parse_string_literal(s: &str) -> Option<Vec<u8>> {
    let caps = STRING_LITERAL.captures(trim(s))?;
    let body = caps.get(1)?.as_str();

    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            match chars.next()? {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                _ => return None,
            }
        } else {
            c
        };

        if !c.is_ascii() {
            return None;
        }
        out.push(c as u8);
    }

    Some(out)
}
