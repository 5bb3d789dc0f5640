//! Parser implementation using lalrpop

pub mod template;

use crate::ast::{Expr, Literal, Span, Spanned, Template};
use crate::error::{CompileError, Result};
use crate::lexer::{Token, tokenize_at};
use template::Segment;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse a whole template. A template made of exactly one `${ }` block
/// evaluates to that expression's value; text around blocks makes it a
/// string concatenation.
pub fn parse_template(source: &str) -> Result<Template> {
    let segments = template::split(source)?;
    let mut parts = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment {
            Segment::Text { text, span } => {
                parts.push(Spanned::new(Expr::Literal(Literal::String(text)), span));
            }
            Segment::Block { body, span } => {
                let tokens = tokenize_at(body, span.start)?;
                if tokens.is_empty() {
                    return Err(CompileError::parser("empty `${ }` block", span));
                }
                parts.push(parse(tokens, span)?);
            }
        }
    }

    let root = match parts.len() {
        0 => Spanned::new(Expr::Literal(Literal::String(String::new())), Span::new(0, 0)),
        1 => parts.remove(0),
        _ => {
            let span = Span::new(0, source.len());
            Spanned::new(Expr::Composite(parts), span)
        }
    };

    Ok(Template {
        source: source.to_string(),
        root,
    })
}

/// Parse a bare expression (the body of a block, without `${ }`)
pub fn parse_expression(source: &str) -> Result<Spanned<Expr>> {
    let tokens = tokenize_at(source, 0)?;
    parse(tokens, Span::new(0, source.len()))
}

/// Parse tokens of one block into an expression
fn parse(tokens: Vec<(Token, Span)>, block: Span) -> Result<Spanned<Expr>> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ExpressionParser::new()
        .parse(token_iter)
        .map_err(|e| {
            let span = match &e {
                lalrpop_util::ParseError::InvalidToken { location } => {
                    Span::new(*location, *location + 1)
                }
                lalrpop_util::ParseError::UnrecognizedEof { location, .. } => {
                    let at = (*location).max(block.start).min(block.end);
                    Span::new(at, block.end)
                }
                lalrpop_util::ParseError::UnrecognizedToken { token, .. } => {
                    Span::new(token.0, token.2)
                }
                lalrpop_util::ParseError::ExtraToken { token } => Span::new(token.0, token.2),
                lalrpop_util::ParseError::User { .. } => block,
            };
            CompileError::parser(format!("{e}"), span)
        })
}
