//! Placeholder scanning
//!
//! Splits query text into literal runs and `:name` placeholders. Text inside
//! quoted literals, quoted identifiers and comments is never treated as a
//! placeholder, and `::` (a cast in several dialects) is left alone.

use winnow::combinator::{alt, not, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_till, take_until, take_while};

type Input<'a> = &'a str;

/// A piece of a query template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split a template into segments
pub fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut input = template;
    repeat(0.., segment)
        .parse_next(&mut input)
        .unwrap_or_else(|_: ErrMode<ContextError>| vec![Segment::Text(template)])
}

/// Distinct placeholder names in order of first appearance
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in segments(template) {
        if let Segment::Placeholder(name) = segment {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn segment<'a>(input: &mut Input<'a>) -> ModalResult<Segment<'a>> {
    alt((placeholder.map(Segment::Placeholder), text_run.map(Segment::Text))).parse_next(input)
}

/// `:name`
fn placeholder<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    preceded(':', identifier).parse_next(input)
}

fn identifier<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (one_of(is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)
}

/// The longest run of text up to the next placeholder
fn text_run<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    repeat::<_, _, (), _, _>(1.., text_piece).take().parse_next(input)
}

fn text_piece(input: &mut Input<'_>) -> ModalResult<()> {
    alt((
        quoted('\''),
        quoted('"'),
        quoted('`'),
        ("--", take_till(0.., '\n')).void(),
        ("/*", alt(((take_until(0.., "*/"), "*/").void(), rest.void()))).void(),
        "::".void(),
        terminated(':', not(one_of(is_ident_start))).void(),
        one_of(['-', '/']).void(),
        take_till(1.., ['\'', '"', '`', '-', '/', ':']).void(),
    ))
    .parse_next(input)
}

/// A quoted run; a doubled quote is an escape and does not close it. An
/// unterminated run extends to the end of the template.
fn quoted<'a>(quote: char) -> impl Parser<Input<'a>, (), ErrMode<ContextError>> {
    (
        quote,
        repeat::<_, _, (), _, _>(0.., alt((take_till(1.., quote).void(), (quote, quote).void()))),
        opt(quote),
    )
        .void()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
