//! Formula tokenizer
//!
//! Formula text is first split into function regions (a registered name
//! followed by a balanced argument list) and arithmetic regions (everything
//! else), so commas separating arguments are never mistaken for operators.
//! Arithmetic regions are then lexed into [`Token`]s, with each function
//! region standing in as a single [`Token::Call`].

use crate::ast::CompareOperator;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use lazy_regex::regex_find;
use nestgrid_core::{Address, RangeAddress};
use std::ops::Range;

/// A call of a registered function found in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall<'a> {
    /// Registered (uppercase) name
    pub name: &'static str,
    /// Raw text of each argument, trimmed
    pub args: Vec<&'a str>,
    /// Byte span of the whole call, name through closing parenthesis
    pub span: Range<usize>,
}

/// A slice of formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region<'a> {
    Function(FunctionCall<'a>),
    Arithmetic(&'a str),
}

/// Split expression text into function and arithmetic regions
///
/// A registered name opens a function region when the next non-blank
/// character is `(`; names inside string literals are never matched.
pub fn split_regions<'a>(text: &'a str, registry: &FunctionRegistry) -> FormulaResult<Vec<Region<'a>>> {
    let mut regions = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < text.len() {
        let string_at = text[i..].find('"').map_or(text.len(), |offset| i + offset);

        let Some((start, def)) = registry.find_in(&text[..string_at], i) else {
            if string_at == text.len() {
                break;
            }
            i = skip_string(text, string_at)?;
            continue;
        };

        let name_end = start + def.name.len();
        let open = name_end + (text[name_end..].len() - text[name_end..].trim_start().len());
        if !text[open..].starts_with('(') {
            i = name_end;
            continue;
        }

        let close = matching_paren(text, open)?;
        if plain_start < start {
            regions.push(Region::Arithmetic(&text[plain_start..start]));
        }
        regions.push(Region::Function(FunctionCall {
            name: def.name,
            args: split_args(&text[open + 1..close]),
            span: start..close + 1,
        }));
        i = close + 1;
        plain_start = i;
    }

    if plain_start < text.len() {
        regions.push(Region::Arithmetic(&text[plain_start..]));
    }

    Ok(regions)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

pub(crate) fn at_word_start(text: &str, i: usize) -> bool {
    text[..i].chars().next_back().map_or(true, |c| !is_word_char(c))
}

/// Byte index just past the string literal starting at `start`
pub(crate) fn skip_string(text: &str, start: usize) -> FormulaResult<usize> {
    let mut chars = text[start + 1..].char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if c == '"' {
            if chars.peek().map(|&(_, next)| next) == Some('"') {
                chars.next();
                continue;
            }
            return Ok(start + 1 + offset + 1);
        }
    }
    Err(FormulaError::parse(format!(
        "unterminated string literal in '{}'",
        text
    )))
}

/// Byte index of the parenthesis closing the one at `open`
fn matching_paren(text: &str, open: usize) -> FormulaResult<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while let Some(c) = text[i..].chars().next() {
        match c {
            '"' => {
                i = skip_string(text, i)?;
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    Err(FormulaError::parse(format!(
        "unbalanced parentheses in '{}'",
        text
    )))
}

/// Split an argument list at top-level commas
fn split_args(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string = false;

    for (i, c) in inner.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());
    args
}

/// Lexical tokens of an arithmetic region
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Text(String),
    Boolean(bool),
    Reference(Address),
    Range(RangeAddress),
    /// Index into the calls returned by [`tokenize`]
    Call(usize),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Compare(CompareOperator),
    LeftParen,
    RightParen,
}

/// Lex expression text, returning the tokens and the function calls they index
pub fn tokenize<'a>(
    text: &'a str,
    registry: &FunctionRegistry,
) -> FormulaResult<(Vec<Token>, Vec<FunctionCall<'a>>)> {
    let mut tokens = Vec::new();
    let mut calls = Vec::new();

    for region in split_regions(text, registry)? {
        match region {
            Region::Function(call) => {
                tokens.push(Token::Call(calls.len()));
                calls.push(call);
            }
            Region::Arithmetic(region) => lex_arithmetic(region, &mut tokens)?,
        }
    }

    Ok((tokens, calls))
}

/// Match a range reference (`A1:C3`, `B:D`, `A1.B2:A1.C4`) at the start of `text`
pub(crate) fn match_range(text: &str) -> Option<&str> {
    let m = regex_find!(
        r"^(?:\$?[A-Za-z]+\$?[0-9]+|\$?[A-Za-z]+|\$?[0-9]+)(?:\.(?:\$?[A-Za-z]+\$?[0-9]+|\$?[A-Za-z]+|\$?[0-9]+))*:(?:\$?[A-Za-z]+\$?[0-9]+|\$?[A-Za-z]+|\$?[0-9]+)(?:\.(?:\$?[A-Za-z]+\$?[0-9]+|\$?[A-Za-z]+|\$?[0-9]+))*",
        text
    )?;
    bounded(text, m)
}

/// Match a single-cell reference (`A1`, `$B$2`, `C3.A1`) at the start of `text`
pub(crate) fn match_reference(text: &str) -> Option<&str> {
    let m = regex_find!(
        r"^\$?[A-Za-z]+\$?[0-9]+(?:\.\$?[A-Za-z]+\$?[0-9]+)*",
        text
    )?;
    bounded(text, m)
}

/// Reject matches that run straight into more identifier characters
fn bounded<'a>(text: &'a str, m: &'a str) -> Option<&'a str> {
    match text[m.len()..].chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '(' || c == '$' => None,
        _ => Some(m),
    }
}

fn read_string(text: &str) -> FormulaResult<(String, usize)> {
    let end = skip_string(text, 0)?;
    Ok((text[1..end - 1].replace("\"\"", "\""), end))
}

fn lex_arithmetic(region: &str, tokens: &mut Vec<Token>) -> FormulaResult<()> {
    let mut rest = region.trim_start();

    while let Some(c) = rest.chars().next() {
        let consumed = if c == '"' {
            let (text, len) = read_string(rest)?;
            tokens.push(Token::Text(text));
            len
        } else if let Some(m) = match_range(rest) {
            tokens.push(Token::Range(RangeAddress::parse(m)?));
            m.len()
        } else if let Some(m) = match_reference(rest) {
            tokens.push(Token::Reference(Address::parse(m)?));
            m.len()
        } else if let Some(m) = regex_find!(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?", rest) {
            if rest[m.len()..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                return Err(FormulaError::parse(format!("malformed number in '{}'", rest)));
            }
            let n: f64 = m
                .parse()
                .map_err(|_| FormulaError::parse(format!("malformed number '{}'", m)))?;
            tokens.push(Token::Number(n));
            m.len()
        } else if let Some(m) = regex_find!(r"^(?i:true|false)\b", rest) {
            tokens.push(Token::Boolean(m.eq_ignore_ascii_case("true")));
            m.len()
        } else if let Some((op, len)) = CompareOperator::parse_prefix(rest) {
            tokens.push(Token::Compare(op));
            len
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '%' => Token::Percent,
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let name: String = rest
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric() || c == &'_')
                        .collect();
                    let after = rest[name.len()..].trim_start();
                    return Err(if after.starts_with('(') {
                        FormulaError::UnknownFunction(name.to_uppercase())
                    } else {
                        FormulaError::parse(format!("unknown name '{}'", name))
                    });
                }
                other => {
                    return Err(FormulaError::parse(format!(
                        "unexpected character '{}'",
                        other
                    )))
                }
            };
            tokens.push(token);
            c.len_utf8()
        };

        rest = rest[consumed..].trim_start();
    }

    Ok(())
}
