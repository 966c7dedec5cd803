// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;

use anyhow::{bail, Result};

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Ident | TokenKind::Eof => self.tok.1.text(),
            _ => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        // Literal token spans exclude their quotes.
        self.end = match self.tok.0 {
            TokenKind::String | TokenKind::Pattern | TokenKind::Regexp => self.tok.1.end + 1,
            _ => self.tok.1.end,
        };
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match self.tok.0 {
            TokenKind::Eof => Ok(()),
            _ => Err(self.tok.1.error("unexpected token after expression")),
        }
    }

    // Span of the current token, widened to its opening quote and prefix.
    fn node_start(&self) -> Span {
        let mut span = self.tok.1.clone();
        let prefix = match self.tok.0 {
            TokenKind::String => 1,
            TokenKind::Pattern | TokenKind::Regexp => 2,
            _ => 0,
        };
        span.start -= prefix;
        span.col -= prefix;
        span
    }

    // Span covering everything from `start` up to the last consumed token.
    fn span_from(&self, start: &Span) -> Span {
        let mut span = start.clone();
        span.end = self.end.max(span.end);
        span
    }

    fn string_value(&self) -> Result<String> {
        let span = &self.tok.1;
        let quoted = &self.source.contents()[span.start as usize - 1..span.end as usize + 1];
        match serde_json::from_str::<String>(quoted) {
            Ok(s) => Ok(s),
            Err(e) => bail!("{} {e}", span.error("invalid string")),
        }
    }

    fn verbatim_value(&self) -> String {
        self.tok.1.text().replace("\\\"", "\"")
    }

    /// Parses a complete rule expression; trailing tokens are an error.
    pub fn parse_expression(&mut self) -> Result<Ref<Expression>> {
        let expr = self.parse_expression_chain()?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parses a macro body, which is either an expression or a bare array.
    pub fn parse_macro(&mut self) -> Result<MacroBody> {
        let body = if self.token_text() == "[" {
            MacroBody::Array(self.parse_array()?)
        } else {
            MacroBody::Expression(self.parse_expression_chain()?)
        };
        self.expect_eof()?;
        Ok(body)
    }

    fn logical_op(&self) -> Option<LogicalOp> {
        match (self.tok.0.clone(), self.token_text()) {
            (TokenKind::Symbol, "&&") | (TokenKind::Ident, "and") => Some(LogicalOp::And),
            (TokenKind::Symbol, "||") | (TokenKind::Ident, "or") => Some(LogicalOp::Or),
            _ => None,
        }
    }

    fn parse_expression_chain(&mut self) -> Result<Ref<Expression>> {
        let start = self.node_start();
        let comparison = self.parse_comparison()?;
        let next = match self.logical_op() {
            Some(op) => {
                self.next_token()?;
                Some((op, self.parse_expression_chain()?))
            }
            None => None,
        };
        Ok(Ref::new(Expression {
            span: self.span_from(&start),
            comparison,
            next,
        }))
    }

    fn scalar_op(&self) -> Option<ScalarOp> {
        if self.tok.0 != TokenKind::Symbol {
            return None;
        }
        Some(match self.token_text() {
            "==" => ScalarOp::Eq,
            "!=" => ScalarOp::Ne,
            "<" => ScalarOp::Lt,
            "<=" => ScalarOp::Le,
            ">" => ScalarOp::Gt,
            ">=" => ScalarOp::Ge,
            "=~" => ScalarOp::Match,
            "!~" => ScalarOp::NotMatch,
            _ => return None,
        })
    }

    fn array_op(&mut self) -> Result<Option<ArrayOp>> {
        if self.tok.0 != TokenKind::Ident {
            return Ok(None);
        }
        match self.token_text() {
            "in" => Ok(Some(ArrayOp::In)),
            "notin" => Ok(Some(ArrayOp::NotIn)),
            "not" => {
                // `not in` is accepted as a spelling of `notin`.
                let mut lookahead = self.lexer.clone();
                let next = lookahead.next_token()?;
                if next.0 == TokenKind::Ident && next.1.text() == "in" {
                    self.next_token()?;
                    Ok(Some(ArrayOp::NotIn))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    fn parse_comparison(&mut self) -> Result<Ref<Comparison>> {
        let start = self.node_start();
        let bit_operation = self.parse_bit_operation()?;

        let rhs = if let Some(op) = self.scalar_op() {
            let op_span = self.tok.1.clone();
            self.next_token()?;
            let next = self.parse_comparison()?;
            Some(ComparisonRhs::Scalar(Ref::new(ScalarComparison {
                span: self.span_from(&op_span),
                op,
                next,
            })))
        } else if let Some(op) = self.array_op()? {
            let op_span = self.tok.1.clone();
            self.next_token()?;
            let array = self.parse_array()?;
            Some(ComparisonRhs::Array(Ref::new(ArrayComparison {
                span: self.span_from(&op_span),
                op,
                array,
            })))
        } else {
            None
        };

        Ok(Ref::new(Comparison {
            span: self.span_from(&start),
            bit_operation,
            rhs,
        }))
    }

    fn parse_bit_operation(&mut self) -> Result<Ref<BitOperation>> {
        let start = self.node_start();
        let unary = self.parse_unary()?;
        let op = match (self.tok.0.clone(), self.token_text()) {
            (TokenKind::Symbol, "&") => Some(BitOp::And),
            (TokenKind::Symbol, "|") => Some(BitOp::Or),
            (TokenKind::Symbol, "^") => Some(BitOp::Xor),
            _ => None,
        };
        let next = match op {
            Some(op) => {
                self.next_token()?;
                Some((op, self.parse_bit_operation()?))
            }
            None => None,
        };
        Ok(Ref::new(BitOperation {
            span: self.span_from(&start),
            unary,
            next,
        }))
    }

    fn parse_unary(&mut self) -> Result<Ref<Unary>> {
        let start = self.node_start();
        let op = match (self.tok.0.clone(), self.token_text()) {
            (TokenKind::Symbol, "!") | (TokenKind::Ident, "not") => Some(UnaryOp::Not),
            (TokenKind::Symbol, "-") => Some(UnaryOp::Minus),
            (TokenKind::Symbol, "^") => Some(UnaryOp::BitNot),
            _ => None,
        };
        match op {
            Some(op) => {
                self.next_token()?;
                let operand = self.parse_unary()?;
                Ok(Ref::new(Unary::Operation {
                    span: self.span_from(&start),
                    op,
                    operand,
                }))
            }
            None => Ok(Ref::new(Unary::Primary(self.parse_primary()?))),
        }
    }

    fn parse_primary(&mut self) -> Result<Ref<Primary>> {
        let span = self.tok.1.clone();
        let primary = match self.tok.0 {
            TokenKind::Ident => {
                if matches!(self.token_text(), "in" | "notin" | "and" | "or") {
                    bail!(span.error("unexpected keyword"));
                }
                Primary::Ident {
                    name: span.text().to_string(),
                    span,
                }
            }
            TokenKind::Number => match parse_number(span.text()) {
                Some(value) => Primary::Number { span, value },
                None => bail!(span.error("invalid number")),
            },
            TokenKind::Duration => match parse_duration(span.text()) {
                Some(value) => Primary::Duration { span, value },
                None => bail!(span.error("invalid duration")),
            },
            TokenKind::String => Primary::String {
                value: self.string_value()?,
                span,
            },
            TokenKind::Pattern => Primary::Pattern {
                value: self.verbatim_value(),
                span,
            },
            TokenKind::Regexp => Primary::Regexp {
                value: self.verbatim_value(),
                span,
            },
            TokenKind::Symbol if self.token_text() == "(" => {
                self.next_token()?;
                let expr = self.parse_expression_chain()?;
                if self.token_text() != ")" {
                    bail!(self.tok.1.error("expecting `)` to close sub-expression"));
                }
                self.next_token()?;
                return Ok(Ref::new(Primary::SubExpression {
                    span: self.span_from(&span),
                    expr,
                }));
            }
            _ => bail!(span.error("expecting identifier, literal or `(`")),
        };
        self.next_token()?;
        Ok(Ref::new(primary))
    }

    fn parse_array(&mut self) -> Result<Ref<Array>> {
        let start = self.tok.1.clone();
        if self.tok.0 == TokenKind::Ident {
            let name = start.text().to_string();
            self.next_token()?;
            return Ok(Ref::new(Array::Ident { span: start, name }));
        }

        self.expect("[", "to start array")?;
        let mut numbers = vec![];
        let mut members = vec![];
        while self.token_text() != "]" {
            if !numbers.is_empty() || !members.is_empty() {
                self.expect(",", "between array items")?;
            }
            let negative = self.token_text() == "-";
            if negative {
                self.next_token()?;
            }
            let item = self.tok.1.clone();
            match self.tok.0 {
                TokenKind::Number if members.is_empty() => match parse_number(item.text()) {
                    Some(value) => numbers.push(if negative { -value } else { value }),
                    None => bail!(item.error("invalid number")),
                },
                TokenKind::String if numbers.is_empty() && !negative => {
                    members.push(StringMember::String(self.string_value()?))
                }
                TokenKind::Pattern if numbers.is_empty() && !negative => {
                    members.push(StringMember::Pattern(self.verbatim_value()))
                }
                TokenKind::Regexp if numbers.is_empty() && !negative => {
                    members.push(StringMember::Regexp(self.verbatim_value()))
                }
                TokenKind::Eof => bail!(item.error("unmatched `[`")),
                _ => bail!(item.error("array items must all be numbers or all be strings")),
            }
            self.next_token()?;
        }
        self.next_token()?;

        let span = self.span_from(&start);
        Ok(Ref::new(if members.is_empty() {
            Array::Numbers {
                span,
                values: numbers,
            }
        } else {
            Array::StringMembers { span, members }
        }))
    }
}

/// Parses `text` as a rule expression.
pub fn parse_expression(file: &str, text: &str) -> Result<Ref<Expression>> {
    let source = Source::from_contents(file.to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_expression()
}

/// Parses `text` as a macro body.
pub fn parse_macro(file: &str, text: &str) -> Result<MacroBody> {
    let source = Source::from_contents(file.to_string(), text.to_string())?;
    let mut parser = Parser::new(&source)?;
    parser.parse_macro()
}
