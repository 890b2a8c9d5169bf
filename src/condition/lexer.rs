//! Tokenizer for condition expressions

use super::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Undefined,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Not,
    And,
    Or,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '0'..='9' => lex_number(source, &mut chars)?,
            '.' if starts_with_digit(&source[offset + 1..]) => lex_number(source, &mut chars)?,
            '\'' | '"' => lex_string(&mut chars, offset)?,
            c if is_ident_start(c) => lex_ident(&mut chars),
            _ => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                let mut take = |expected: char| {
                    if next == Some(expected) {
                        chars.next();
                        true
                    } else {
                        false
                    }
                };
                match c {
                    '.' => Token::Dot,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '&' if take('&') => Token::And,
                    '|' if take('|') => Token::Or,
                    '<' if take('=') => Token::Le,
                    '<' => Token::Lt,
                    '>' if take('=') => Token::Ge,
                    '>' => Token::Gt,
                    '=' if take('=') => {
                        if chars.next_if(|&(_, n)| n == '=').is_some() {
                            Token::StrictEq
                        } else {
                            Token::Eq
                        }
                    }
                    '!' if take('=') => {
                        if chars.next_if(|&(_, n)| n == '=').is_some() {
                            Token::StrictNe
                        } else {
                            Token::Ne
                        }
                    }
                    '!' => Token::Not,
                    other => {
                        return Err(ConditionError::UnexpectedCharacter {
                            found: other,
                            offset,
                        });
                    }
                }
            }
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn starts_with_digit(rest: &str) -> bool {
    rest.starts_with(|c: char| c.is_ascii_digit())
}

/// Digits with an optional fraction and exponent: `12`, `.5`, `1.5e-3`
fn lex_number(source: &str, chars: &mut Chars<'_>) -> Result<Token, ConditionError> {
    let start = chars.peek().map_or(0, |&(i, _)| i);
    let mut end = start;
    let mut seen_dot = false;

    while let Some(&(i, c)) = chars.peek() {
        let fraction_follows = c == '.' && !seen_dot && starts_with_digit(&source[i + 1..]);
        if c.is_ascii_digit() || fraction_follows {
            seen_dot |= c == '.';
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }

    if let Some(&(i, 'e' | 'E')) = chars.peek() {
        let rest = &source[i + 1..];
        let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
        if starts_with_digit(digits) {
            chars.next();
            if digits.len() < rest.len() {
                chars.next();
            }
            while let Some((j, _)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
                end = j + 1;
            }
        }
    }

    source[start..end]
        .parse()
        .map(Token::Number)
        .map_err(|_| ConditionError::InvalidNumber {
            literal: source[start..end].to_string(),
            offset: start,
        })
}

fn lex_string(chars: &mut Chars<'_>, offset: usize) -> Result<Token, ConditionError> {
    let Some((_, quote)) = chars.next() else {
        return Err(ConditionError::UnterminatedString { offset });
    };
    let mut value = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(Token::Str(value)),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(ConditionError::UnterminatedString { offset })
}

fn lex_ident(chars: &mut Chars<'_>) -> Token {
    let mut name = String::new();
    while let Some((_, c)) = chars.next_if(|&(_, c)| is_ident_continue(c)) {
        name.push(c);
    }

    match name.as_str() {
        "true" => Token::True,
        "false" => Token::False,
        "null" => Token::Null,
        "undefined" => Token::Undefined,
        _ => Token::Ident(name),
    }
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
    fn tokenizes_comparison_with_path() {
        assert_eq!(
            kinds("affection.Alice >= 1.5"),
            vec![
                Token::Ident("affection".into()),
                Token::Dot,
                Token::Ident("Alice".into()),
                Token::Ge,
                Token::Number(1.5),
            ]
        );
    }

    #[test]
    fn numbers_take_exponents_and_leading_dots() {
        assert_eq!(
            kinds("1e3 2.5E-2 .5 4e+1"),
            vec![
                Token::Number(1000.0),
                Token::Number(0.025),
                Token::Number(0.5),
                Token::Number(40.0),
            ]
        );
        // Without exponent digits the `e` starts an identifier
        assert_eq!(
            kinds("2em"),
            vec![Token::Number(2.0), Token::Ident("em".into())]
        );
        assert_eq!(
            kinds("a.b"),
            vec![
                Token::Ident("a".into()),
                Token::Dot,
                Token::Ident("b".into())
            ]
        );
    }

    #[test]
    fn distinguishes_loose_and_strict_equality() {
        assert_eq!(
            kinds("a == b === c != d !== e"),
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::Ident("b".into()),
                Token::StrictEq,
                Token::Ident("c".into()),
                Token::Ne,
                Token::Ident("d".into()),
                Token::StrictNe,
                Token::Ident("e".into()),
            ]
        );
    }

    #[test]
    fn strings_support_both_quotes_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "say \"hi\"""#),
            vec![Token::Str("it's".into()), Token::Str("say \"hi\"".into())]
        );
    }

    #[test]
    fn unicode_identifiers_are_accepted() {
        assert_eq!(
            kinds("affection.アリス"),
            vec![
                Token::Ident("affection".into()),
                Token::Dot,
                Token::Ident("アリス".into()),
            ]
        );
    }

    #[test]
    fn rejects_single_ampersand_and_open_string() {
        assert!(matches!(
            tokenize("a & b"),
            Err(ConditionError::UnexpectedCharacter { found: '&', offset: 2 })
        ));
        assert!(matches!(
            tokenize("'open"),
            Err(ConditionError::UnterminatedString { offset: 0 })
        ));
    }
}
