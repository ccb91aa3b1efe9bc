//! The second pass: turns laid-out records into machine words.
use super::ast::{Directive, Field, Mnemonic, Record, RecordKind};
use super::error::EncodeErrorKind;
use super::lexer::{is_register, parse_number, parse_string_literal, register_number, split_first};
use super::symbols::SymbolTable;

/// Encodes records against a finished symbol table.
pub struct Encoder<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> Encoder<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Encoder { symbols }
    }

    /// Encodes one record into the words it occupies, in address order.
    pub fn encode(&self, record: &Record) -> Result<Vec<u16>, EncodeErrorKind> {
        let words = match record.kind {
            RecordKind::Pseudo => self.pseudo(record)?,
            RecordKind::Operation => vec![self.operation(record)?],
        };

        for (idx, word) in words.iter().enumerate() {
            trace!("x{:04X}: {:016b}", record.address.wrapping_add(idx as u16), word);
        }
        debug!("line {}: {} => {} word(s)", record.line, record.text, words.len());
        Ok(words)
    }

    fn pseudo(&self, record: &Record) -> Result<Vec<u16>, EncodeErrorKind> {
        let (keyword, operand) = split_first(&record.text);
        let undefined = || EncodeErrorKind::UndefinedSymbol(operand.to_string());

        match keyword.parse::<Directive>() {
            Ok(Directive::Fill) => {
                let value = parse_number(operand).ok_or_else(undefined)?;
                Ok(vec![value as u16])
            }
            Ok(Directive::Blkw) => {
                let count = parse_number(operand).ok_or_else(undefined)?;
                Ok(vec![0; count.max(0) as usize])
            }
            Ok(Directive::Stringz) => {
                let bytes = parse_string_literal(operand).ok_or_else(undefined)?;
                Ok(bytes.into_iter().map(u16::from).chain(std::iter::once(0)).collect())
            }
            _ => Err(EncodeErrorKind::UnknownMnemonic(keyword.to_string())),
        }
    }

    fn operation(&self, record: &Record) -> Result<u16, EncodeErrorKind> {
        let mut tokens = record.text.split_whitespace();
        let mnemonic = tokens.next().unwrap_or_default();
        let operands: Vec<&str> = tokens.collect();

        match Mnemonic::lookup(mnemonic) {
            Some(Mnemonic::Trap(trap)) => {
                if !operands.is_empty() {
                    return Err(EncodeErrorKind::OperandCount {
                        mnemonic: trap.name,
                        expected: 0,
                        found: operands.len(),
                    });
                }
                Ok(trap.word)
            }
            Some(Mnemonic::Operation(op)) => {
                if operands.len() != op.arity() {
                    return Err(EncodeErrorKind::OperandCount {
                        mnemonic: op.mnemonic,
                        expected: op.arity(),
                        found: operands.len(),
                    });
                }

                let mut word = op.template;
                for (field, token) in op.fields.iter().zip(operands) {
                    word |= self.field(*field, token, record)?;
                }
                Ok(word)
            }
            _ => Err(EncodeErrorKind::UnknownMnemonic(mnemonic.to_string())),
        }
    }

    /// Encodes one operand, already shifted into place.
    fn field(&self, field: Field, token: &str, record: &Record) -> Result<u16, EncodeErrorKind> {
        match field {
            Field::Register(shift) => Ok(register(token)? << shift),
            Field::RegisterOrImm5 => {
                if is_register(token) {
                    Ok(register(token)?)
                } else {
                    Ok(0b10_0000 | self.value(token, field, record)?)
                }
            }
            Field::PcOffset(_) | Field::Offset6 | Field::TrapVector => {
                self.value(token, field, record)
            }
        }
    }

    /// Resolves a label to its PC-relative offset, or parses a literal,
    /// and truncates the result to the field's width.
    fn value(&self, token: &str, field: Field, record: &Record) -> Result<u16, EncodeErrorKind> {
        if is_register(token) {
            return Err(EncodeErrorKind::UnexpectedRegister(token.to_string()));
        }

        let value = match self.symbols.resolve(token) {
            Some(target) => target as i32 - record.address as i32 - 1,
            None => parse_number(token)
                .ok_or_else(|| EncodeErrorKind::UndefinedSymbol(token.to_string()))?,
        };

        let width = field.width();
        // Trap vectors are unsigned; every other field is two's complement.
        let in_range = match field {
            Field::TrapVector => fits(value, width) || fits_unsigned(value, width),
            _ => fits(value, width),
        };
        if !in_range {
            warn!(
                "line {}: `{}` ({}) does not fit in {} bits and was truncated",
                record.line, token, value, width
            );
        }
        Ok(truncate(value, width))
    }
}

fn register(token: &str) -> Result<u16, EncodeErrorKind> {
    match register_number(token) {
        Some(n) if n <= 7 => Ok(n as u16),
        Some(_) => Err(EncodeErrorKind::InvalidRegister(token.to_string())),
        None => Err(EncodeErrorKind::ExpectedRegister(token.to_string())),
    }
}

/// Keeps the low `width` bits of a two's-complement value.
pub fn truncate(value: i32, width: u8) -> u16 {
    (value as u16) & ((1u32 << width) - 1) as u16
}

/// True if `value` is representable as a `width`-bit two's-complement number.
pub fn fits(value: i32, width: u8) -> bool {
    let min = -(1i32 << (width - 1));
    let max = (1i32 << (width - 1)) - 1;
    value >= min && value <= max
}

/// True if `value` is representable as a `width`-bit unsigned number.
pub fn fits_unsigned(value: i32, width: u8) -> bool {
    value >= 0 && value < (1i32 << width)
}
