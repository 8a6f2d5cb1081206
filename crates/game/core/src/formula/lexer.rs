//! Tokenizer for the formula language.

use super::FormulaError;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Double(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Question,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

/// Token plus the character offset it starts at.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        let token = if c.is_ascii_digit() {
            let (token, next) = number(&chars, i)?;
            i = next;
            token
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "in" => Token::In,
                _ => Token::Ident(word),
            }
        } else if c == '"' || c == '\'' {
            let (text, next) = string(&chars, i)?;
            i = next;
            Token::Str(text)
        } else {
            let pair = chars.get(i + 1).copied();
            let (token, width) = match (c, pair) {
                ('=', Some('=')) => (Token::EqEq, 2),
                ('!', Some('=')) => (Token::NotEq, 2),
                ('<', Some('=')) => (Token::Le, 2),
                ('>', Some('=')) => (Token::Ge, 2),
                ('&', Some('&')) => (Token::AndAnd, 2),
                ('|', Some('|')) => (Token::OrOr, 2),
                ('<', _) => (Token::Lt, 1),
                ('>', _) => (Token::Gt, 1),
                ('!', _) => (Token::Bang, 1),
                ('+', _) => (Token::Plus, 1),
                ('-', _) => (Token::Minus, 1),
                ('*', _) => (Token::Star, 1),
                ('/', _) => (Token::Slash, 1),
                ('%', _) => (Token::Percent, 1),
                ('?', _) => (Token::Question, 1),
                (':', _) => (Token::Colon, 1),
                ('.', _) => (Token::Dot, 1),
                (',', _) => (Token::Comma, 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                ('[', _) => (Token::LBracket, 1),
                (']', _) => (Token::RBracket, 1),
                ('{', _) => (Token::LBrace, 1),
                ('}', _) => (Token::RBrace, 1),
                _ => {
                    return Err(FormulaError::Syntax {
                        position: i,
                        message: format!("unexpected character '{c}'"),
                    });
                }
            };
            i += width;
            token
        };
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        position: chars.len(),
    });
    Ok(tokens)
}

fn number(chars: &[char], start: usize) -> Result<(Token, usize), FormulaError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    // `1.5` is a double; `xs.0` style access is not part of the language.
    let is_double = i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit();
    if is_double {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    let text: String = chars[start..i].iter().collect();
    let invalid = || FormulaError::Syntax {
        position: start,
        message: format!("invalid number '{text}'"),
    };
    let token = if is_double {
        Token::Double(text.parse().map_err(|_| invalid())?)
    } else {
        Token::Int(text.parse().map_err(|_| invalid())?)
    };
    Ok((token, i))
}

fn string(chars: &[char], start: usize) -> Result<(String, usize), FormulaError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars.get(i + 1).copied();
                let ch = match escaped {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('\\') => '\\',
                    Some('\'') => '\'',
                    Some('"') => '"',
                    other => {
                        return Err(FormulaError::Syntax {
                            position: i,
                            message: format!("invalid escape '\\{}'", other.unwrap_or(' ')),
                        });
                    }
                };
                out.push(ch);
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(FormulaError::Syntax {
        position: start,
        message: "unterminated string".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("a.b >= 2.5 && !x"),
            vec![
                Token::Ident("a".into()),
                Token::Dot,
                Token::Ident("b".into()),
                Token::Ge,
                Token::Double(2.5),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' + "a\"b""#),
            vec![
                Token::Str("it's".into()),
                Token::Plus,
                Token::Str("a\"b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        let err = tokenize("1 + #").unwrap_err();
        assert!(matches!(err, FormulaError::Syntax { position: 4, .. }));
        assert!(tokenize("'open").is_err());
    }
}
