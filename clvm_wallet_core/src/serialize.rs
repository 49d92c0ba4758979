//! CLVM binary format
//!
//! `0xff` prefixes a pair, bytes below `0x80` are single-byte atoms, `0x80`
//! is nil and everything else is a length prefix followed by atom bytes.
//! Both directions use explicit stacks so deep trees cannot exhaust the
//! call stack.

use crate::types::{ClvmError, ClvmValue, Node};

const CONS_BOX_MARKER: u8 = 0xff;
const MAX_ATOM_LEN: u64 = 0x4_0000_0000;

enum ParseOp {
    Node,
    Cons,
}

/// Streaming parser over serialized CLVM bytes
pub struct ClvmParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ClvmParser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Parse one complete value starting at the current position
    pub fn parse(&mut self) -> Result<Node, ClvmError> {
        let mut ops = vec![ParseOp::Node];
        let mut values: Vec<Node> = Vec::new();

        while let Some(op) = ops.pop() {
            match op {
                ParseOp::Node => {
                    let byte = self.next_byte()?;
                    if byte == CONS_BOX_MARKER {
                        ops.push(ParseOp::Cons);
                        ops.push(ParseOp::Node);
                        ops.push(ParseOp::Node);
                    } else {
                        values.push(self.parse_atom(byte)?);
                    }
                }
                ParseOp::Cons => {
                    let rest = values.pop();
                    let first = values.pop();
                    match (first, rest) {
                        (Some(first), Some(rest)) => values.push(ClvmValue::pair(first, rest)),
                        _ => return Err(self.error("value stack underflow")),
                    }
                }
            }
        }

        values.pop().ok_or_else(|| self.error("no value parsed"))
    }

    fn parse_atom(&mut self, first_byte: u8) -> Result<Node, ClvmError> {
        match first_byte {
            0x80 => Ok(ClvmValue::nil()),
            0x00..=0x7f => Ok(ClvmValue::atom(vec![first_byte])),
            _ => {
                let size = self.decode_size(first_byte)?;
                let atom = self.take(size)?;
                Ok(ClvmValue::atom(atom.to_vec()))
            }
        }
    }

    /// Decode a length prefix; the count of leading one bits gives its width
    fn decode_size(&mut self, first_byte: u8) -> Result<usize, ClvmError> {
        let prefix_len = first_byte.leading_ones() as usize;
        if prefix_len > 5 {
            return Err(self.error("invalid atom length prefix"));
        }
        let mask = 0xffu8 >> (prefix_len + 1).min(8);
        let mut size = u64::from(first_byte & mask);
        for &byte in self.take(prefix_len - 1)? {
            size = (size << 8) | u64::from(byte);
        }
        if size >= MAX_ATOM_LEN {
            return Err(self.error("atom length exceeds limit"));
        }
        usize::try_from(size).map_err(|_| self.error("atom size too large for this platform"))
    }

    fn next_byte(&mut self) -> Result<u8, ClvmError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ClvmError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.error("atom size exceeds remaining bytes"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn error(&self, message: &str) -> ClvmError {
        ClvmError::SerializationError(format!("{} at byte {}", message, self.pos))
    }
}

/// Parse exactly one serialized value, rejecting trailing bytes
pub fn node_from_bytes(bytes: &[u8]) -> Result<Node, ClvmError> {
    let mut parser = ClvmParser::new(bytes);
    let node = parser.parse()?;
    if parser.position() != bytes.len() {
        return Err(ClvmError::SerializationError(format!(
            "{} trailing bytes after value",
            bytes.len() - parser.position()
        )));
    }
    Ok(node)
}

pub fn node_from_hex(hex_str: &str) -> Result<Node, ClvmError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| ClvmError::SerializationError(format!("invalid hex: {}", e)))?;
    node_from_bytes(&bytes)
}

/// Encode a value in the standard serialization format
pub fn node_to_bytes(node: &Node) -> Result<Vec<u8>, ClvmError> {
    let mut out = Vec::new();
    let mut pending: Vec<&Node> = vec![node];
    while let Some(current) = pending.pop() {
        match current.as_ref() {
            ClvmValue::Pair(first, rest) => {
                out.push(CONS_BOX_MARKER);
                pending.push(rest);
                pending.push(first);
            }
            ClvmValue::Atom(bytes) => write_atom(&mut out, bytes)?,
        }
    }
    Ok(out)
}

fn write_atom(out: &mut Vec<u8>, atom: &[u8]) -> Result<(), ClvmError> {
    match atom {
        [] => out.push(0x80),
        [byte] if *byte < 0x80 => out.push(*byte),
        _ => {
            let len = atom.len() as u64;
            if len < 0x40 {
                out.push(0x80 | len as u8);
            } else if len < 0x2000 {
                out.extend_from_slice(&[0xc0 | (len >> 8) as u8, len as u8]);
            } else if len < 0x10_0000 {
                out.extend_from_slice(&[0xe0 | (len >> 16) as u8, (len >> 8) as u8, len as u8]);
            } else if len < 0x800_0000 {
                out.extend_from_slice(&[
                    0xf0 | (len >> 24) as u8,
                    (len >> 16) as u8,
                    (len >> 8) as u8,
                    len as u8,
                ]);
            } else if len < MAX_ATOM_LEN {
                out.extend_from_slice(&[
                    0xf8 | (len >> 32) as u8,
                    (len >> 24) as u8,
                    (len >> 16) as u8,
                    (len >> 8) as u8,
                    len as u8,
                ]);
            } else {
                return Err(ClvmError::SerializationError(format!(
                    "atom of {} bytes is too large to serialize",
                    len
                )));
            }
            out.extend_from_slice(atom);
        }
    }
    Ok(())
}
