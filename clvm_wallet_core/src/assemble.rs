//! Textual assembler and disassembler for compiled CLVM
//!
//! Accepts the low-level s-expression form: lists, dotted pairs, decimal
//! integers, `0x` hex atoms, quoted strings and operator mnemonics. No
//! macros or symbol binding; that is a compiler's job.

use crate::number::Number;
use crate::operators::{atom_to_keyword, keyword_to_atom};
use crate::types::{ClvmError, ClvmValue, Node};

enum Token {
    Open,
    Close,
    Dot,
    Atom(Node),
}

/// A list under construction
struct ListFrame {
    start: usize,
    items: Vec<Node>,
    dotted: bool,
    tail: Option<Node>,
}

impl ListFrame {
    fn new(start: usize) -> Self {
        Self {
            start,
            items: Vec::new(),
            dotted: false,
            tail: None,
        }
    }

    fn mark_dot(&mut self, offset: usize) -> Result<(), ClvmError> {
        if self.items.is_empty() || self.dotted {
            return Err(ClvmError::parse(offset, "illegal dot expression"));
        }
        self.dotted = true;
        Ok(())
    }

    fn push(&mut self, node: Node, offset: usize) -> Result<(), ClvmError> {
        if !self.dotted {
            self.items.push(node);
            return Ok(());
        }
        if self.tail.is_some() {
            return Err(ClvmError::parse(offset, "illegal dot expression"));
        }
        self.tail = Some(node);
        Ok(())
    }

    fn finish(self, offset: usize) -> Result<Node, ClvmError> {
        let tail = match (self.dotted, self.tail) {
            (true, None) => return Err(ClvmError::parse(offset, "illegal dot expression")),
            (_, tail) => tail.unwrap_or_else(ClvmValue::nil),
        };
        Ok(self
            .items
            .into_iter()
            .rev()
            .fold(tail, |rest, item| ClvmValue::pair(item, rest)))
    }
}

/// Assembler over a single source string
pub struct Assembler<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Assembler<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse exactly one expression; anything after it is an error
    pub fn parse(&mut self) -> Result<Node, ClvmError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Err(ClvmError::parse(self.pos, "empty input"));
        }
        let node = self.parse_expr()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ClvmError::parse(self.pos, "unexpected trailing input"));
        }
        Ok(node)
    }

    fn parse_expr(&mut self) -> Result<Node, ClvmError> {
        let mut stack: Vec<ListFrame> = Vec::new();
        loop {
            self.skip_whitespace();
            let offset = self.pos;
            let completed = match self.next_token()? {
                None => {
                    return Err(match stack.last() {
                        Some(frame) => ClvmError::parse(
                            offset,
                            format!("missing ) for list opened at offset {}", frame.start),
                        ),
                        None => ClvmError::parse(offset, "unexpected end of input"),
                    })
                }
                Some(Token::Open) => {
                    stack.push(ListFrame::new(offset));
                    continue;
                }
                Some(Token::Dot) => {
                    stack
                        .last_mut()
                        .ok_or_else(|| ClvmError::parse(offset, "illegal dot expression"))?
                        .mark_dot(offset)?;
                    continue;
                }
                Some(Token::Close) => stack
                    .pop()
                    .ok_or_else(|| ClvmError::parse(offset, "unexpected )"))?
                    .finish(offset)?,
                Some(Token::Atom(node)) => node,
            };
            match stack.last_mut() {
                Some(frame) => frame.push(completed, offset)?,
                None => return Ok(completed),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ClvmError> {
        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        match ch {
            '(' => {
                self.advance();
                Ok(Some(Token::Open))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::Close))
            }
            '"' | '\'' => self.parse_string(ch).map(|node| Some(Token::Atom(node))),
            _ => {
                let start = self.pos;
                while let Some(ch) = self.current_char() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == ';' {
                        break;
                    }
                    self.advance();
                }
                let text = &self.input[start..self.pos];
                if text == "." {
                    return Ok(Some(Token::Dot));
                }
                parse_atom_token(text, start).map(|node| Some(Token::Atom(node)))
            }
        }
    }

    /// Parse a quoted string; the closing quote must match the opening one
    fn parse_string(&mut self, quote: char) -> Result<Node, ClvmError> {
        let start = self.pos;
        self.advance();
        let content_start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch == quote {
                let content = &self.input[content_start..self.pos];
                self.advance();
                return Ok(ClvmValue::atom(content.as_bytes().to_vec()));
            }
            self.advance();
        }
        Err(ClvmError::parse(start, "unterminated string"))
    }

    /// Skip whitespace and `;` comments
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }
}

fn parse_atom_token(text: &str, offset: usize) -> Result<Node, ClvmError> {
    if is_decimal(text) {
        let number: Number = text
            .parse()
            .map_err(|_| ClvmError::parse(offset, format!("invalid integer {}", text)))?;
        return Ok(ClvmValue::atom(number.to_bytes()));
    }

    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return parse_hex(digits, offset);
    }

    let symbol = text.strip_prefix('#').unwrap_or(text);
    keyword_to_atom(symbol)
        .map(ClvmValue::atom)
        .map_err(|_| ClvmError::parse(offset, format!("unknown symbol {}", text)))
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_hex(digits: &str, offset: usize) -> Result<Node, ClvmError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ClvmError::parse(offset, format!("invalid hex 0x{}", digits)));
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    hex::decode(&padded)
        .map(ClvmValue::atom)
        .map_err(|e| ClvmError::parse(offset, format!("invalid hex: {}", e)))
}

/// Convenience function to assemble source text into a value
pub fn assemble(source: &str) -> Result<Node, ClvmError> {
    Assembler::new(source).parse()
}

enum Piece<'a> {
    Node(&'a Node, bool),
    Text(&'static str),
}

/// Render a value back to assembler text
///
/// Atoms in operator position print as mnemonics, printable strings as
/// quoted text, short canonical integers in decimal, and the rest as hex;
/// `assemble(&disassemble(v))` reproduces `v`.
pub fn disassemble(node: &Node) -> String {
    let mut out = String::new();
    let mut work = vec![Piece::Node(node, false)];

    while let Some(piece) = work.pop() {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Node(node, operator_position) => match node.as_ref() {
                ClvmValue::Atom(bytes) => out.push_str(&format_atom(bytes, operator_position)),
                ClvmValue::Pair(first, rest) => {
                    out.push('(');
                    let mut pieces = vec![Piece::Node(first, true)];
                    let mut current = rest;
                    loop {
                        match current.as_ref() {
                            ClvmValue::Pair(item, next) => {
                                pieces.push(Piece::Text(" "));
                                pieces.push(Piece::Node(item, false));
                                current = next;
                            }
                            ClvmValue::Atom(bytes) if bytes.is_empty() => break,
                            ClvmValue::Atom(_) => {
                                pieces.push(Piece::Text(" . "));
                                pieces.push(Piece::Node(current, false));
                                break;
                            }
                        }
                    }
                    pieces.push(Piece::Text(")"));
                    work.extend(pieces.into_iter().rev());
                }
            },
        }
    }
    out
}

fn format_atom(bytes: &[u8], operator_position: bool) -> String {
    if bytes.is_empty() {
        return "()".to_string();
    }
    if operator_position {
        if let Some(keyword) = atom_to_keyword(bytes) {
            return keyword.to_string();
        }
    }
    if bytes.len() > 2 && bytes.iter().all(|&b| (0x20..0x7f).contains(&b) && b != b'"') {
        // printable ascii, so valid utf-8
        return format!("\"{}\"", String::from_utf8_lossy(bytes));
    }
    if bytes.len() <= 4 && Number::from_signed_bytes(bytes).to_bytes() == bytes {
        return Number::from_signed_bytes(bytes).to_string();
    }
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_of(node: &Node) -> Vec<u8> {
        node.as_atom().expect("atom").to_vec()
    }

    #[test]
    fn test_integers_are_canonical() {
        assert_eq!(atom_of(&assemble("0").unwrap()), Vec::<u8>::new());
        assert_eq!(atom_of(&assemble("100").unwrap()), vec![100]);
        assert_eq!(atom_of(&assemble("128").unwrap()), vec![0x00, 0x80]);
        assert_eq!(atom_of(&assemble("-1").unwrap()), vec![0xff]);
    }

    #[test]
    fn test_hex_atoms_keep_bytes() {
        assert_eq!(atom_of(&assemble("0x000a").unwrap()), vec![0x00, 0x0a]);
        assert_eq!(atom_of(&assemble("0xabc").unwrap()), vec![0x0a, 0xbc]);
        assert!(matches!(
            assemble("0xzz"),
            Err(ClvmError::ParseError { .. })
        ));
    }

    #[test]
    fn test_strings_and_symbols() {
        assert_eq!(atom_of(&assemble("\"hello\"").unwrap()), b"hello".to_vec());
        assert_eq!(atom_of(&assemble("'hi there'").unwrap()), b"hi there".to_vec());
        assert_eq!(atom_of(&assemble("q").unwrap()), vec![0x01]);
        assert_eq!(atom_of(&assemble("#add").unwrap()), vec![0x10]);
    }

    #[test]
    fn test_unknown_symbol_is_error() {
        let err = assemble("(frobnicate 1)").unwrap_err();
        assert!(matches!(err, ClvmError::ParseError { offset: 1, .. }));
    }

    #[test]
    fn test_lists_and_dots() {
        let node = assemble("(q . (1 2 3))").unwrap();
        let (first, rest) = node.as_pair().unwrap();
        assert_eq!(atom_of(first), vec![1]);
        assert_eq!(rest.to_list().unwrap().len(), 3);

        let dotted = assemble("(1 . 2)").unwrap();
        let (_, tail) = dotted.as_pair().unwrap();
        assert_eq!(atom_of(tail), vec![2]);

        assert!(assemble("()").unwrap().is_nil());
    }

    #[test]
    fn test_malformed_input() {
        for bad in ["(1 2", "1 2)", ")", "(. 1)", "(1 . )", "(1 . 2 3)", "(1 . . 2)", "\"open", ""] {
            assert!(
                matches!(assemble(bad), Err(ClvmError::ParseError { .. })),
                "expected parse error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_comments_are_skipped() {
        let node = assemble("; leading comment\n(+ 1 ; inline\n 2)").unwrap();
        assert_eq!(node.to_list().unwrap().len(), 3);
    }

    #[test]
    fn test_disassemble_roundtrip() {
        for source in [
            "(q . 1)",
            "(+ (q . 10) (q . 20))",
            "(a (q 2 2 (c 2 (c 5 ()))) (c (q . 70) 1))",
            "(q . \"example\")",
            "(c (q . 0xdeadbeefcafe) ())",
            "(q . -7)",
        ] {
            let node = assemble(source).unwrap();
            let text = disassemble(&node);
            assert_eq!(assemble(&text).unwrap(), node, "roundtrip of {}", source);
        }
        assert_eq!(disassemble(&assemble("(q . 1)").unwrap()), "(q . 1)");
        assert_eq!(
            disassemble(&assemble("(+ (q . 10) ())").unwrap()),
            "(+ (q . 10) ())"
        );
    }
}
