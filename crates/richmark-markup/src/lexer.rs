//! # Lexer - Tokenizing Structural Markup
//!
//! This module is the first stage of reading structural markup: it breaks the
//! source into coarse tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every byte of the input appears in exactly one token. Concatenating the
//! token texts gives back the original input:
//!
//! ```
//! use richmark_markup::lexer::lex;
//!
//! let input = "<p>Hello <strong>world</strong></p>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Token Design
//!
//! Tags are lexed as whole tokens (`<td colspan="1">` is one `StartTag`).
//! Attributes inside a start tag are split by a second, smaller lexer
//! ([`lex_attributes`]) because attribute syntax is only meaningful inside a
//! tag. Anything that is not a tag, comment or declaration is `Text`; a stray
//! `<` that does not open a tag is `Lt` and is treated as text by the parser.

use logos::Logos;

use crate::tree::Attribute;

/// Token kinds produced by the markup lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<name ...>` or `<name ... />`
    #[regex(r"<[a-zA-Z][^>]*>")]
    StartTag,

    /// `</name>`
    #[regex(r"</[a-zA-Z][^>]*>")]
    EndTag,

    /// `<!-- ... -->`, running to end of input when unterminated
    #[token("<!--", comment)]
    Comment,

    /// `<!DOCTYPE html>` and other declarations
    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    /// Character data between tags
    #[regex(r"[^<]+")]
    Text,

    /// A `<` that does not start a tag
    #[token("<")]
    Lt,
}

fn comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let remainder = lex.remainder();
    match remainder.find("-->") {
        Some(end) => lex.bump(end + 3),
        None => lex.bump(remainder.len()),
    }
    true
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        // Logos errors mean an unrecognized character; keep it as text
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push(Token { kind, text });
    }

    tokens
}

/// Tokens inside a start tag, after the element name.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\x0C]+")]
enum AttrToken {
    #[regex(r#"[^ \t\r\n\x0C"'=]+"#)]
    Word,

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,
}

/// A start tag split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

/// Split the text of a `StartTag` token into name, attributes and the
/// self-closing flag. Element and attribute names are lower-cased; attribute
/// values are entity-decoded.
pub fn lex_start_tag(text: &str) -> StartTag {
    let inner = text.strip_prefix('<').unwrap_or(text);
    let inner = inner.strip_suffix('>').unwrap_or(inner);
    let name_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(inner.len());
    let name = inner[..name_len].to_ascii_lowercase();

    let mut rest = inner[name_len..].trim_end();
    let self_closing = rest.ends_with('/');
    if self_closing {
        rest = &rest[..rest.len() - 1];
    }

    StartTag {
        name,
        attributes: lex_attributes(rest),
        self_closing,
    }
}

/// Element name of an `EndTag` token, lower-cased.
pub fn end_tag_name(text: &str) -> String {
    text.trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

/// Lex the attribute section of a start tag.
pub fn lex_attributes(input: &str) -> Vec<Attribute> {
    let mut lexer = AttrToken::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        // Unterminated quotes are dropped
        if let Ok(kind) = result {
            tokens.push((kind, lexer.slice()));
        }
    }

    let mut attributes = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let (kind, text) = tokens[i];
        if kind != AttrToken::Word {
            i += 1;
            continue;
        }

        let name = text.to_ascii_lowercase();
        let value = match (tokens.get(i + 1), tokens.get(i + 2)) {
            (Some((AttrToken::Eq, _)), Some((value_kind, value_text))) => {
                i += 3;
                match value_kind {
                    AttrToken::DoubleQuoted | AttrToken::SingleQuoted => {
                        Some(decode(&value_text[1..value_text.len() - 1]))
                    }
                    AttrToken::Word => Some(decode(value_text)),
                    AttrToken::Eq => Some(String::new()),
                }
            }
            (Some((AttrToken::Eq, _)), None) => {
                i += 2;
                Some(String::new())
            }
            _ => {
                i += 1;
                None
            }
        };

        // First occurrence wins, as in HTML
        if !attributes.iter().any(|a: &Attribute| a.name == name) {
            attributes.push(Attribute { name, value });
        }
    }

    attributes
}

pub(crate) fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lexing_is_lossless() {
        let input = "<!DOCTYPE html><p class=\"x\">a < b <!-- note --></p>";
        let tokens = lex(input);
        let reconstructed: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(input, reconstructed);
    }

    #[test]
    fn token_kinds() {
        let kinds: Vec<_> = lex("<p>x</p><!--c--><br/>")
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StartTag,
                TokenKind::Text,
                TokenKind::EndTag,
                TokenKind::Comment,
                TokenKind::StartTag,
            ]
        );
    }

    #[test]
    fn stray_angle_bracket_is_not_a_tag() {
        let tokens = lex("1 < 2");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::StartTag));
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        let tokens = lex("<p>a</p><!-- open");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Comment));
    }

    #[test]
    fn start_tag_parts() {
        let tag = lex_start_tag(r#"<TD colspan="2" data-x='y' hidden rowspan=3>"#);
        assert_eq!(tag.name, "td");
        assert!(!tag.self_closing);
        assert_eq!(
            tag.attributes,
            vec![
                Attribute::new("colspan", "2"),
                Attribute::new("data-x", "y"),
                Attribute::flag("hidden"),
                Attribute::new("rowspan", "3"),
            ]
        );
    }

    #[test]
    fn self_closing_tag() {
        let tag = lex_start_tag("<col style=\"min-width: 25px\" />");
        assert_eq!(tag.name, "col");
        assert!(tag.self_closing);
        assert_eq!(
            tag.attributes,
            vec![Attribute::new("style", "min-width: 25px")]
        );
    }

    #[test]
    fn attribute_values_are_decoded() {
        let tag = lex_start_tag(r#"<a href="https://example.com/?a=1&amp;b=2">"#);
        assert_eq!(
            tag.attributes,
            vec![Attribute::new("href", "https://example.com/?a=1&b=2")]
        );
    }

    #[test]
    fn end_tag_names_are_lowercased() {
        assert_eq!(end_tag_name("</TBODY >"), "tbody");
    }
}
