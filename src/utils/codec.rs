//! Conversion of raw BibTeX field values into plain display strings.
//!
//! The BibTeX parser already strips the outer delimiters of a value, but titles
//! and names frequently still carry LaTeX markup (`{IEEE}`, `\'e`, `\&`).
//! [`decode`] renders the parsed chunks as text and, when any markup is left,
//! flattens it into literal characters.

use biblatex::{Chunk, Spanned};
use thiserror::Error;

/// Errors raised while flattening LaTeX markup in a field value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed markup in field '{field}': unbalanced braces in \"{value}\"")]
    UnbalancedBraces { field: String, value: String },

    #[error("Malformed markup in field '{field}': dangling backslash in \"{value}\"")]
    DanglingEscape { field: String, value: String },
}

/// Decode a raw field value into its plain user representation.
///
/// An absent field decodes to an empty string. Markup is only flattened when
/// the rendered text contains a backslash or an opening brace; anything else is
/// returned as rendered.
pub fn decode(field: &str, raw: Option<&[Spanned<Chunk>]>) -> Result<String, DecodeError> {
    let Some(chunks) = raw else {
        return Ok(String::new());
    };

    let text = to_user_string(chunks);
    if text.contains('\\') || text.contains('{') {
        flatten_markup(&text).map_err(|kind| kind.into_error(field, &text))
    } else {
        Ok(text)
    }
}

/// Render parsed chunks the way a user would type them.
pub fn to_user_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|spanned| match &spanned.v {
            Chunk::Normal(s) | Chunk::Verbatim(s) => s.clone(),
            Chunk::Math(s) => format!("${}$", s),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    UnbalancedBraces,
    DanglingEscape,
}

impl Malformed {
    fn into_error(self, field: &str, value: &str) -> DecodeError {
        let field = field.to_string();
        let value = value.to_string();
        match self {
            Malformed::UnbalancedBraces => DecodeError::UnbalancedBraces { field, value },
            Malformed::DanglingEscape => DecodeError::DanglingEscape { field, value },
        }
    }
}

/// Flatten LaTeX markup into literal characters.
fn flatten_markup(text: &str) -> Result<String, Malformed> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' => {
                depth += 1;
                i += 1;
            }
            '}' => {
                depth = depth.checked_sub(1).ok_or(Malformed::UnbalancedBraces)?;
                i += 1;
            }
            '~' => {
                out.push(' ');
                i += 1;
            }
            '\\' => {
                i = command(&chars, i + 1, &mut out)?;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    if depth != 0 {
        return Err(Malformed::UnbalancedBraces);
    }
    Ok(out)
}

/// Consume the command starting right after a backslash at `start`, returning
/// the index of the first character not consumed.
fn command(chars: &[char], start: usize, out: &mut String) -> Result<usize, Malformed> {
    let Some(&first) = chars.get(start) else {
        return Err(Malformed::DanglingEscape);
    };

    match first {
        '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
            out.push(first);
            Ok(start + 1)
        }
        '\\' => {
            out.push(' ');
            Ok(start + 1)
        }
        '\'' | '`' | '^' | '"' | '~' | '=' | '.' => accent(chars, first, start + 1, out),
        c if c.is_ascii_alphabetic() => {
            let mut end = start;
            while end < chars.len() && chars[end].is_ascii_alphabetic() {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            if name == "c" {
                return accent(chars, 'c', end, out);
            }
            if let Some(symbol) = symbol(&name) {
                out.push_str(symbol);
            }
            // A control word swallows the spaces that follow it
            while end < chars.len() && chars[end] == ' ' {
                end += 1;
            }
            Ok(end)
        }
        // Control symbols without a meaning of their own (`\,`, `\ `) render as a space
        _ => {
            out.push(' ');
            Ok(start + 1)
        }
    }
}

/// Apply an accent command to the letter that follows it, either bare (`\'e`)
/// or braced (`\'{e}`).
fn accent(chars: &[char], mark: char, start: usize, out: &mut String) -> Result<usize, Malformed> {
    let mut i = start;
    while mark == 'c' && chars.get(i) == Some(&' ') {
        i += 1;
    }

    let (base, next) = match chars.get(i) {
        Some(&'{') => match (chars.get(i + 1), chars.get(i + 2)) {
            (Some(&'}'), _) => return Ok(i + 2),
            (Some(&'\\'), Some(&'i')) if chars.get(i + 3) == Some(&'}') => ('i', i + 4),
            (Some(&c), Some(&'}')) => (c, i + 3),
            // Not a single letter argument: leave the group to the caller
            _ => return Ok(i),
        },
        Some(&'\\') if chars.get(i + 1) == Some(&'i') => ('i', i + 2),
        Some(&c) => (c, i + 1),
        None => return Err(Malformed::DanglingEscape),
    };

    out.push(compose(mark, base).unwrap_or(base));
    Ok(next)
}

fn compose(mark: char, base: char) -> Option<char> {
    let composed = match (mark, base) {
        ('\'', 'a') => 'á',
        ('\'', 'e') => 'é',
        ('\'', 'i') => 'í',
        ('\'', 'o') => 'ó',
        ('\'', 'u') => 'ú',
        ('\'', 'y') => 'ý',
        ('\'', 'c') => 'ć',
        ('\'', 'n') => 'ń',
        ('\'', 's') => 'ś',
        ('\'', 'z') => 'ź',
        ('\'', 'A') => 'Á',
        ('\'', 'E') => 'É',
        ('\'', 'I') => 'Í',
        ('\'', 'O') => 'Ó',
        ('\'', 'U') => 'Ú',
        ('`', 'a') => 'à',
        ('`', 'e') => 'è',
        ('`', 'i') => 'ì',
        ('`', 'o') => 'ò',
        ('`', 'u') => 'ù',
        ('`', 'A') => 'À',
        ('`', 'E') => 'È',
        ('^', 'a') => 'â',
        ('^', 'e') => 'ê',
        ('^', 'i') => 'î',
        ('^', 'o') => 'ô',
        ('^', 'u') => 'û',
        ('^', 'A') => 'Â',
        ('^', 'E') => 'Ê',
        ('^', 'O') => 'Ô',
        ('"', 'a') => 'ä',
        ('"', 'e') => 'ë',
        ('"', 'i') => 'ï',
        ('"', 'o') => 'ö',
        ('"', 'u') => 'ü',
        ('"', 'y') => 'ÿ',
        ('"', 'A') => 'Ä',
        ('"', 'O') => 'Ö',
        ('"', 'U') => 'Ü',
        ('~', 'a') => 'ã',
        ('~', 'o') => 'õ',
        ('~', 'n') => 'ñ',
        ('~', 'A') => 'Ã',
        ('~', 'O') => 'Õ',
        ('~', 'N') => 'Ñ',
        ('=', 'a') => 'ā',
        ('=', 'e') => 'ē',
        ('=', 'o') => 'ō',
        ('.', 'z') => 'ż',
        ('.', 'Z') => 'Ż',
        ('c', 'c') => 'ç',
        ('c', 'C') => 'Ç',
        ('c', 's') => 'ş',
        ('c', 'S') => 'Ş',
        _ => return None,
    };
    Some(composed)
}

fn symbol(name: &str) -> Option<&'static str> {
    let symbol = match name {
        "ss" => "ß",
        "o" => "ø",
        "O" => "Ø",
        "ae" => "æ",
        "AE" => "Æ",
        "oe" => "œ",
        "OE" => "Œ",
        "aa" => "å",
        "AA" => "Å",
        "l" => "ł",
        "L" => "Ł",
        "i" => "ı",
        "textendash" => "–",
        "textemdash" => "—",
        "textregistered" => "®",
        "texttrademark" => "™",
        "TeX" => "TeX",
        "LaTeX" => "LaTeX",
        _ => return None,
    };
    Some(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(s: &str) -> Vec<Spanned<Chunk>> {
        vec![Spanned::detached(Chunk::Normal(s.to_string()))]
    }

    #[test]
    fn test_absent_field_is_empty() {
        assert_eq!(decode("title", None).unwrap(), "");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let raw = normal("A Survey of Cloud Computing: Issues & Challenges?");
        assert_eq!(
            decode("title", Some(raw.as_slice())).unwrap(),
            "A Survey of Cloud Computing: Issues & Challenges?"
        );
    }

    #[test]
    fn test_chunks_are_concatenated() {
        let raw = vec![
            Spanned::detached(Chunk::Normal("Energy in ".to_string())),
            Spanned::detached(Chunk::Verbatim("IEEE".to_string())),
            Spanned::detached(Chunk::Normal(" networks".to_string())),
        ];
        assert_eq!(decode("title", Some(raw.as_slice())).unwrap(), "Energy in IEEE networks");
    }

    #[test]
    fn test_math_chunk_keeps_delimiters() {
        let raw = vec![
            Spanned::detached(Chunk::Normal("Solving ".to_string())),
            Spanned::detached(Chunk::Math("x^2".to_string())),
        ];
        assert_eq!(to_user_string(&raw), "Solving $x^2$");
    }

    #[test]
    fn test_braces_are_removed() {
        let raw = normal("Virtual Machine Placement in {IEEE} Clouds");
        assert_eq!(
            decode("title", Some(raw.as_slice())).unwrap(),
            "Virtual Machine Placement in IEEE Clouds"
        );
    }

    #[test]
    fn test_escaped_specials_become_literal() {
        let raw = normal(r"Profit \& Loss at 100\% \{braced\}");
        assert_eq!(decode("title", Some(raw.as_slice())).unwrap(), "Profit & Loss at 100% {braced}");
    }

    #[test]
    fn test_accents_are_composed() {
        let raw = normal(r#"Jo\~{a}o Gon\c{c}alves and Jos\'e M\"uller"#);
        assert_eq!(
            decode("author", Some(raw.as_slice())).unwrap(),
            "João Gonçalves and José Müller"
        );
    }

    #[test]
    fn test_dotless_i_in_accent() {
        let raw = normal(r"Mart\'{\i}n");
        assert_eq!(decode("author", Some(raw.as_slice())).unwrap(), "Martín");
    }

    #[test]
    fn test_symbol_and_unknown_commands() {
        let raw = normal(r"Stra\ss e and \emph{Very} \textbf{Bold} \LaTeX");
        assert_eq!(
            decode("title", Some(raw.as_slice())).unwrap(),
            "Straße and Very Bold LaTeX"
        );
    }

    #[test]
    fn test_tilde_is_space() {
        let raw = normal(r"Section~{3}");
        assert_eq!(decode("title", Some(raw.as_slice())).unwrap(), "Section 3");
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        let raw = normal("Broken {title");
        let err = decode("title", Some(raw.as_slice())).unwrap_err();
        assert!(matches!(err, DecodeError::UnbalancedBraces { ref field, .. } if field == "title"));

        let raw = normal("Broken} title");
        assert!(decode("title", Some(raw.as_slice())).is_err());
    }

    #[test]
    fn test_dangling_backslash_fails() {
        let raw = normal(r"Ends with \");
        let err = decode("doi", Some(raw.as_slice())).unwrap_err();
        assert!(matches!(err, DecodeError::DanglingEscape { ref field, .. } if field == "doi"));
        assert!(err.to_string().contains("doi"));
    }
}
