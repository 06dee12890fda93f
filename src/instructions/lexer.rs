//! Tokenizer and grammar for one source line:
//! `OPCODE operand (, operand)*`, with `;` comments and case-insensitive names.

use crate::error::ParseError;
use crate::registers::Register;

use super::{Instruction, Opcode, Operand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Opcode(Opcode),
    Register(Register),
    Number(u16),
    Comma,
    /// An identifier that is neither an opcode nor a register.
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based column of the first character.
    pub column: usize,
}

/// Parses `0b...`, `0x...` or decimal. Anything above 0xFFFF is rejected.
pub fn parse_number(text: &str) -> Option<u16> {
    let lower = text.to_ascii_lowercase();
    let value = if let Some(bin) = lower.strip_prefix("0b") {
        u32::from_str_radix(bin, 2).ok()?
    } else if let Some(hex) = lower.strip_prefix("0x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        lower.parse::<u32>().ok()?
    };
    u16::try_from(value).ok()
}

/// Removes a trailing `;` comment.
pub fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Name of a bare `label:` line.
pub fn label_name(line: &str) -> Option<&str> {
    let name = strip_comment(line).trim().strip_suffix(':')?.trim();
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some(name)
}

pub fn tokenize(line: &str) -> Result<Vec<Token>, ParseError> {
    let source = strip_comment(line);
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let column = source[..start].chars().count() + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == ',' {
            tokens.push(Token {
                kind: TokenKind::Comma,
                text: ",".to_string(),
                column,
            });
            i += 1;
            continue;
        }

        if c.is_ascii_alphanumeric() || c == '_' {
            let mut j = i;
            while j < chars.len() && (chars[j].1.is_ascii_alphanumeric() || chars[j].1 == '_') {
                j += 1;
            }
            let end = chars.get(j).map(|(pos, _)| *pos).unwrap_or(source.len());
            let text = &source[start..end];

            let kind = if c.is_ascii_digit() {
                match parse_number(text) {
                    Some(v) => TokenKind::Number(v),
                    None => {
                        return Err(ParseError::InvalidOperand {
                            text: text.to_string(),
                            column,
                        });
                    }
                }
            } else if let Some(op) = Opcode::from_mnemonic(text) {
                TokenKind::Opcode(op)
            } else if let Some(reg) = Register::from_name(text) {
                TokenKind::Register(reg)
            } else {
                TokenKind::Word
            };

            tokens.push(Token {
                kind,
                text: text.to_string(),
                column,
            });
            i = j;
            continue;
        }

        return Err(ParseError::UnexpectedToken {
            text: c.to_string(),
            column,
        });
    }

    Ok(tokens)
}

/// `Ok(None)` for a blank or comment-only line.
pub fn parse_line(line: &str) -> Result<Option<Instruction>, ParseError> {
    let tokens = tokenize(line)?;
    let mut iter = tokens.iter();

    let first = match iter.next() {
        Some(t) => t,
        None => return Ok(None),
    };
    let opcode = match first.kind {
        TokenKind::Opcode(op) => op,
        _ => {
            return Err(ParseError::UnknownOpcode {
                text: first.text.clone(),
                column: first.column,
            });
        }
    };

    let mut operands = Vec::new();
    loop {
        let tok = match iter.next() {
            Some(t) => t,
            None if operands.is_empty() => break,
            // Trailing comma
            None => return Err(ParseError::UnexpectedEnd(line.trim().to_string())),
        };
        let operand = match tok.kind {
            TokenKind::Register(r) => Operand::Register(r),
            TokenKind::Number(v) => Operand::Immediate(v),
            TokenKind::Word => {
                return Err(ParseError::InvalidOperand {
                    text: tok.text.clone(),
                    column: tok.column,
                });
            }
            TokenKind::Opcode(_) | TokenKind::Comma => {
                return Err(ParseError::UnexpectedToken {
                    text: tok.text.clone(),
                    column: tok.column,
                });
            }
        };
        operands.push(operand);

        match iter.next() {
            None => break,
            Some(t) if t.kind == TokenKind::Comma => {}
            Some(t) => {
                return Err(ParseError::UnexpectedToken {
                    text: t.text.clone(),
                    column: t.column,
                });
            }
        }
    }

    if operands.len() != opcode.operand_count() {
        return Err(ParseError::OperandCount {
            opcode: opcode.name(),
            expected: opcode.operand_count(),
            found: operands.len(),
        });
    }

    Ok(Some(Instruction { opcode, operands }))
}
