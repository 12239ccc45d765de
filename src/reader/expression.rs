//! Tokenizer and parser for rule expressions.
//!
//! Grammar:
//!
//! ```text
//! expression := clause ("; else " clause)*
//! clause     := token (whitespace token)*
//! token      := field-ref | byte-range | literal | ###TODAY### | ###REMOVE###
//! field-ref  := TAG ("$" CODE){0,2}            e.g. 945$h, 245$a$b
//! byte-range := (TAG | "LDR") "/" FROM ("-" TO)?   e.g. 008/36-39, LDR/7
//! literal    := '"' ... '"' | '`' ... '`'
//! ```
//!
//! Splitting into clauses and tokens never happens inside a quoted span.

use crate::error::{MappingError, Result};
use lazy_static::lazy_static;
use regex::Regex;

/// Separator between fallback clauses.
pub const ELSE_DELIMITER: &str = "; else ";

/// Placeholder resolving to the current date.
pub const TODAY_PLACEHOLDER: &str = "###TODAY###";

/// Placeholder turning the rule into a deletion marker.
pub const REMOVE_PLACEHOLDER: &str = "###REMOVE###";

/// Pseudo tag addressing the record leader in byte-range references.
pub const LEADER_TAG: &str = "LDR";

lazy_static! {
    static ref FIELD_REFERENCE: Regex =
        Regex::new(r"^(\d{3})((?:\$[a-zA-Z0-9]){0,2})$").expect("valid field reference regex");
    static ref BYTE_RANGE: Regex =
        Regex::new(r"^(\d{3}|LDR)/(\d+)(?:-(\d+))?$").expect("valid byte range regex");
}

/// One token of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// All occurrences of a tag, optionally narrowed to up to two subfield codes.
    Field {
        /// Three-digit tag
        tag: String,
        /// Subfield codes, at most two
        codes: Vec<char>,
    },
    /// Character positions of the leader or a control field.
    ByteRange {
        /// Three-digit tag or `LDR`
        tag: String,
        /// Zero-based start, inclusive
        start: usize,
        /// Zero-based end, exclusive; capped at the data length when sliced
        end: usize,
    },
    /// A quoted string.
    Literal(String),
    /// `###TODAY###`
    Today,
    /// `###REMOVE###`
    Remove,
}

/// Tokens evaluated together; the first non-blank clause wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Tokens in source order
    pub tokens: Vec<Token>,
}

/// A parsed rule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    /// Fallback clauses in priority order
    pub clauses: Vec<Clause>,
}

impl Expression {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidExpression`] for unterminated quotes,
    /// unknown tokens and empty byte ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use marc_mapping::reader::expression::{Expression, Token};
    ///
    /// let expr = Expression::parse(r#"945$h; else "MAIN""#)?;
    /// assert_eq!(expr.clauses.len(), 2);
    /// assert_eq!(expr.clauses[1].tokens, vec![Token::Literal("MAIN".into())]);
    /// # Ok::<(), marc_mapping::MappingError>(())
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let clauses = split_clauses(expression)?
            .into_iter()
            .map(|clause| {
                let tokens = split_tokens(clause)?
                    .into_iter()
                    .map(classify)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Clause { tokens })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Expression { clauses })
    }
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '`'
}

fn unterminated(text: &str) -> MappingError {
    MappingError::InvalidExpression(format!("unterminated quote in '{text}'"))
}

/// Split on the else delimiter outside quoted spans.
fn split_clauses(expression: &str) -> Result<Vec<&str>> {
    let mut clauses = Vec::new();
    let mut open: Option<char> = None;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match open {
            Some(quote) if c == quote => open = None,
            Some(_) => {}
            None if is_quote(c) => open = Some(c),
            None => {
                if i >= start && expression[i..].starts_with(ELSE_DELIMITER) {
                    clauses.push(&expression[start..i]);
                    start = i + ELSE_DELIMITER.len();
                }
            }
        }
    }

    if open.is_some() {
        return Err(unterminated(expression));
    }
    clauses.push(&expression[start..]);
    Ok(clauses)
}

/// Split on whitespace outside quoted spans.
fn split_tokens(clause: &str) -> Result<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut open: Option<char> = None;
    let mut start: Option<usize> = None;

    for (i, c) in clause.char_indices() {
        match open {
            Some(quote) if c == quote => open = None,
            Some(_) => {}
            None if c.is_whitespace() => {
                if let Some(s) = start.take() {
                    tokens.push(&clause[s..i]);
                }
            }
            None => {
                if is_quote(c) {
                    open = Some(c);
                }
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }

    if open.is_some() {
        return Err(unterminated(clause));
    }
    if let Some(s) = start {
        tokens.push(&clause[s..]);
    }
    Ok(tokens)
}

fn classify(token: &str) -> Result<Token> {
    match token {
        TODAY_PLACEHOLDER => return Ok(Token::Today),
        REMOVE_PLACEHOLDER => return Ok(Token::Remove),
        _ => {}
    }

    if let Some(first) = token.chars().next().filter(|c| is_quote(*c)) {
        if token.len() >= 2 && token.ends_with(first) {
            let inner = &token[1..token.len() - 1];
            if !inner.contains(first) {
                return Ok(Token::Literal(inner.to_string()));
            }
        }
        return Err(MappingError::InvalidExpression(format!(
            "malformed literal {token}"
        )));
    }

    if let Some(caps) = FIELD_REFERENCE.captures(token) {
        let codes = caps[2].chars().filter(|c| *c != '$').collect();
        return Ok(Token::Field {
            tag: caps[1].to_string(),
            codes,
        });
    }

    if let Some(caps) = BYTE_RANGE.captures(token) {
        let parse = |s: &str| {
            s.parse::<usize>()
                .map_err(|e| MappingError::InvalidExpression(format!("{token}: {e}")))
        };
        let from = parse(&caps[2])?;
        let to = match caps.get(3) {
            Some(m) => parse(m.as_str())?,
            None => from,
        };
        if from == 0 || to < from {
            return Err(MappingError::InvalidExpression(format!(
                "empty byte range {token}"
            )));
        }
        return Ok(Token::ByteRange {
            tag: caps[1].to_string(),
            start: from - 1,
            end: to,
        });
    }

    Err(MappingError::InvalidExpression(format!(
        "unrecognized token '{token}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(expression: &str) -> Vec<Token> {
        let mut parsed = Expression::parse(expression).unwrap();
        assert_eq!(parsed.clauses.len(), 1);
        parsed.clauses.remove(0).tokens
    }

    #[test]
    fn test_field_references() {
        assert_eq!(
            tokens("945$h"),
            vec![Token::Field {
                tag: "945".into(),
                codes: vec!['h']
            }]
        );
        assert_eq!(
            tokens("245$a$b 001"),
            vec![
                Token::Field {
                    tag: "245".into(),
                    codes: vec!['a', 'b']
                },
                Token::Field {
                    tag: "001".into(),
                    codes: Vec::new()
                }
            ]
        );
    }

    #[test]
    fn test_byte_ranges() {
        assert_eq!(
            tokens("008/36-39"),
            vec![Token::ByteRange {
                tag: "008".into(),
                start: 35,
                end: 39
            }]
        );
        assert_eq!(
            tokens("LDR/7"),
            vec![Token::ByteRange {
                tag: "LDR".into(),
                start: 6,
                end: 7
            }]
        );
        assert!(Expression::parse("LDR/0").is_err());
        assert!(Expression::parse("008/9-3").is_err());
    }

    #[test]
    fn test_quote_aware_splitting() {
        assert_eq!(
            tokens(r#""Main library" 945$h `a b`"#),
            vec![
                Token::Literal("Main library".into()),
                Token::Field {
                    tag: "945".into(),
                    codes: vec!['h']
                },
                Token::Literal("a b".into()),
            ]
        );

        let parsed = Expression::parse(r#""x; else y"; else 500$a"#).unwrap();
        assert_eq!(parsed.clauses.len(), 2);
        assert_eq!(parsed.clauses[0].tokens, vec![Token::Literal("x; else y".into())]);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(tokens("###TODAY###"), vec![Token::Today]);
        assert_eq!(tokens("###REMOVE###"), vec![Token::Remove]);
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(Expression::parse(r#""open"#).is_err());
        assert!(Expression::parse("94$h").is_err());
        assert!(Expression::parse("945$h$i$j").is_err());
        assert!(Expression::parse("title").is_err());
        assert!(Expression::parse(r#""a"b""#).is_err());
    }
}
