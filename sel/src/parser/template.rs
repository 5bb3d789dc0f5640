//! Splitting template text into literal runs and `${ }` blocks

use crate::ast::Span;
use crate::error::{CompileError, Result};

/// One piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Literal text with `\${` escapes already resolved
    Text { text: String, span: Span },
    /// Body of a `${ }` block; `span` covers the body only
    Block { body: &'a str, span: Span },
}

/// Split a template into segments. Quoted strings inside a block may
/// contain `}` without closing it.
pub fn split(source: &str) -> Result<Vec<Segment<'_>>> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && source[i + 1..].starts_with("${") {
            text.push_str("${");
            i += 3;
            continue;
        }
        if source[i..].starts_with("${") {
            if !text.is_empty() {
                segments.push(Segment::Text {
                    text: std::mem::take(&mut text),
                    span: Span::new(text_start, i),
                });
            }
            let body_start = i + 2;
            let body_end = find_block_end(source, body_start).ok_or_else(|| {
                CompileError::parser("unterminated `${` block", Span::new(i, source.len()))
            })?;
            segments.push(Segment::Block {
                body: &source[body_start..body_end],
                span: Span::new(body_start, body_end),
            });
            i = body_end + 1;
            text_start = i;
            continue;
        }
        // Advance by a whole character so multi-byte text survives
        let ch = source[i..].chars().next().unwrap_or_default();
        text.push(ch);
        i += ch.len_utf8().max(1);
    }

    if !text.is_empty() {
        segments.push(Segment::Text {
            text,
            span: Span::new(text_start, source.len()),
        });
    }

    Ok(segments)
}

/// Byte index of the `}` closing a block whose body starts at `start`
fn find_block_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'}' => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let segments = split("hello").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Text {
                text: "hello".to_string(),
                span: Span::new(0, 5)
            }]
        );
    }

    #[test]
    fn test_single_block() {
        let segments = split("${ a + b }").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Block {
                body: " a + b ",
                span: Span::new(2, 9)
            }]
        );
    }

    #[test]
    fn test_mixed_text_and_blocks() {
        let segments = split("Hi ${Name}!").unwrap();
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[0], Segment::Text { text, .. } if text == "Hi "));
        assert!(matches!(&segments[1], Segment::Block { body, .. } if *body == "Name"));
        assert!(matches!(&segments[2], Segment::Text { text, span } if text == "!" && *span == Span::new(10, 11)));
    }

    #[test]
    fn test_brace_inside_string_does_not_close() {
        let segments = split("${ Concat('}', \"}\") }").unwrap();
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Block { body, .. } if *body == " Concat('}', \"}\") "));
    }

    #[test]
    fn test_escaped_block_is_text() {
        let segments = split(r"cost \${x}").unwrap();
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], Segment::Text { text, .. } if text == "cost ${x}"));
    }

    #[test]
    fn test_unterminated_block() {
        let err = split("abc ${ x + 1").unwrap_err();
        assert!(err.message().contains("unterminated"));
        assert_eq!(err.span(), Some(Span::new(4, 12)));
    }

    #[test]
    fn test_multibyte_text() {
        let segments = split("é${x}").unwrap();
        assert!(matches!(&segments[0], Segment::Text { text, span } if text == "é" && *span == Span::new(0, 2)));
        assert!(matches!(&segments[1], Segment::Block { span, .. } if *span == Span::new(4, 5)));
    }
}
