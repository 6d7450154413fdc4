//! Restricted arithmetic and boolean expression evaluation.
//!
//! Backs `expr`, `bc`, and the `awk` line filter. The grammar is fixed:
//! numeric literals, `+ - * / %`, unary minus, parentheses, comparisons,
//! and `&& || !` (also spelled `and`/`or`/`not`). User text never reaches
//! anything more general than this recursive-descent evaluator.

use sandsh_types::error::{Result, ShellError};

/// Evaluate an expression to a number. Comparisons and boolean operators
/// yield 1 or 0; any nonzero value is truthy.
pub fn eval(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(err(format!(
            "unexpected trailing input at '{}'",
            parser.describe_current()
        )));
    }
    Ok(value)
}

/// Render a result the way the calculator commands print it: integral
/// values without a decimal point.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn err(msg: impl Into<String>) -> ShellError {
    ShellError::Expression(msg.into())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| err(format!("bad number '{text}'")))?;
                tokens.push(Token::Number(value));
            },
            'a'..='z' | 'A'..='Z' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::AndAnd),
                    "or" => tokens.push(Token::OrOr),
                    "not" => tokens.push(Token::Bang),
                    _ => return Err(err(format!("unknown word '{word}'"))),
                }
            },
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            },
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            },
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            },
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            },
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            },
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            },
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            },
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            },
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(err("single '=' is not an operator; use '=='"));
                }
            },
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            },
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(err("single '&' is not an operator; use '&&'"));
                }
            },
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(err("single '|' is not an operator; use '||'"));
                }
            },
            other => return Err(err(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(t) => format!("{t:?}"),
            None => "end of input".to_string(),
        }
    }

    fn or_expr(&mut self) -> Result<f64> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::OrOr) {
            self.bump();
            let right = self.and_expr()?;
            left = f64::from(left != 0.0 || right != 0.0);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<f64> {
        let mut left = self.not_expr()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.bump();
            let right = self.not_expr()?;
            left = f64::from(left != 0.0 && right != 0.0);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<f64> {
        if self.peek() == Some(&Token::Bang) {
            self.bump();
            let value = self.not_expr()?;
            return Ok(f64::from(value == 0.0));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<f64> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => Token::Lt,
            Some(Token::Le) => Token::Le,
            Some(Token::Gt) => Token::Gt,
            Some(Token::Ge) => Token::Ge,
            Some(Token::EqEq) => Token::EqEq,
            Some(Token::NotEq) => Token::NotEq,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.additive()?;
        let truth = match op {
            Token::Lt => left < right,
            Token::Le => left <= right,
            Token::Gt => left > right,
            Token::Ge => left >= right,
            Token::EqEq => left == right,
            Token::NotEq => left != right,
            _ => unreachable!("matched above"),
        };
        Ok(f64::from(truth))
    }

    fn additive(&mut self) -> Result<f64> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    left += self.term()?;
                },
                Some(Token::Minus) => {
                    self.bump();
                    left -= self.term()?;
                },
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut left = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    left *= self.unary()?;
                },
                Some(Token::Slash) => {
                    self.bump();
                    let right = self.unary()?;
                    if right == 0.0 {
                        return Err(err("division by zero"));
                    }
                    left /= right;
                },
                Some(Token::Percent) => {
                    self.bump();
                    let right = self.unary()?;
                    if right == 0.0 {
                        return Err(err("modulo by zero"));
                    }
                    left %= right;
                },
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        if self.peek() == Some(&Token::Minus) {
            self.bump();
            return Ok(-self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<f64> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.or_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(err("missing ')'")),
                }
            },
            Some(t) => Err(err(format!("unexpected token {t:?}"))),
            None => Err(err("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(input: &str) -> f64 {
        eval(input).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(ok("1 + 2 * 3"), 7.0);
        assert_eq!(ok("(1 + 2) * 3"), 9.0);
        assert_eq!(ok("10 - 4 - 3"), 3.0);
        assert_eq!(ok("7 % 3"), 1.0);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(ok("-3 + 5"), 2.0);
        assert_eq!(ok("--4"), 4.0);
        assert_eq!(ok("2 * -3"), -6.0);
    }

    #[test]
    fn floats() {
        assert_eq!(ok("1.5 * 2"), 3.0);
        assert_eq!(ok("0.1 + 0.7"), 0.1 + 0.7);
    }

    #[test]
    fn comparisons_yield_booleans() {
        assert_eq!(ok("3 < 5"), 1.0);
        assert_eq!(ok("3 >= 5"), 0.0);
        assert_eq!(ok("2 == 2"), 1.0);
        assert_eq!(ok("2 != 2"), 0.0);
        assert_eq!(ok("1 + 1 == 2"), 1.0);
    }

    #[test]
    fn boolean_connectives() {
        assert_eq!(ok("1 && 0"), 0.0);
        assert_eq!(ok("1 || 0"), 1.0);
        assert_eq!(ok("!0"), 1.0);
        assert_eq!(ok("not 5"), 0.0);
        assert_eq!(ok("3 > 1 and 2 > 1"), 1.0);
        assert_eq!(ok("0 or 1 > 2"), 0.0);
    }

    #[test]
    fn division_and_modulo_by_zero_error() {
        assert!(eval("1 / 0").is_err());
        assert!(eval("1 % 0").is_err());
    }

    #[test]
    fn malformed_input_errors() {
        assert!(eval("").is_err());
        assert!(eval("1 +").is_err());
        assert!(eval("(1 + 2").is_err());
        assert!(eval("1 2").is_err());
        assert!(eval("foo + 1").is_err());
        assert!(eval("1 = 2").is_err());
        assert!(eval("1 & 2").is_err());
    }

    #[test]
    fn no_code_execution_surface() {
        // Anything that is not the fixed grammar is rejected outright.
        assert!(eval("__import__").is_err());
        assert!(eval("system(1)").is_err());
        assert!(eval("1; 2").is_err());
    }

    #[test]
    fn format_value_trims_integers() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(-2.0), "-2");
        assert_eq!(format_value(2.5), "2.5");
    }
}
