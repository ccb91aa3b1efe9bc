//! The first pass: assigns an address to every instruction and
//! collects labels into the symbol table.
//!
//! No machine code is produced here. Each instruction is saved as a
//! [`Record`] so the second pass can encode it once every label is known.
use std::convert::TryFrom;
use std::io::{BufRead, BufReader, Read};

use super::ast::{Directive, Mnemonic, Record, RecordKind};
use super::error::Error;
use super::lexer::{format_line, is_valid_label, parse_number, parse_string_literal, split_first};
use super::symbols::SymbolTable;

/// Largest value `.FILL` accepts.
pub const FILL_MAX: i32 = 65535;
/// Smallest value `.FILL` accepts.
pub const FILL_MIN: i32 = -65536;
/// Largest `.BLKW` count.
pub const BLKW_MAX: i32 = 100;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    BeforeOrigin,
    InProgram,
    Done,
}

pub struct Layout<'a> {
    symbols: &'a mut SymbolTable,
    records: Vec<Record>,
    state: State,
    address: u16,
    /// Non-empty lines seen after `.END`.
    ignored: usize,
    error_log: bool,
}

impl<'a> Layout<'a> {
    pub fn new(symbols: &'a mut SymbolTable, error_log: bool) -> Self {
        Layout {
            symbols,
            records: Vec::with_capacity(256),
            state: State::BeforeOrigin,
            address: 0,
            ignored: 0,
            error_log,
        }
    }

    /// Run the first pass over `reader`, consuming the layout and returning
    /// the instruction records in program order.
    pub fn run<R: Read>(mut self, reader: R) -> Result<Vec<Record>, Error> {
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let line_num = index + 1;
            let raw = line.map_err(|source| Error::ReadInput { line: line_num, source })?;

            if let Err(e) = self.line(&raw, line_num) {
                if self.error_log {
                    error!("{}", e);
                    error!(" {:>4} | {}", line_num, raw);
                }
                return Err(e);
            }
        }

        match self.state {
            State::BeforeOrigin => Err(Error::MissingOrigin),
            State::InProgram => Err(Error::MissingEnd),
            State::Done => {
                if self.ignored > 0 {
                    warn!("ignored {} line(s) after .END", self.ignored);
                }
                info!(
                    "first pass: {} instruction(s), {} label(s)",
                    self.records.len(),
                    self.symbols.len()
                );
                for (name, sym) in self.symbols.iter_sorted() {
                    debug!("  x{:04X} {} (line {})", sym.address, name, sym.line);
                }
                Ok(self.records)
            }
        }
    }

    fn line(&mut self, raw: &str, line: usize) -> Result<(), Error> {
        let formatted = format_line(raw);
        if formatted.is_empty() {
            return Ok(());
        }
        if self.state == State::Done {
            self.ignored += 1;
            return Ok(());
        }

        let (label, command) = split_label(&formatted, line)?;
        if command.is_empty() {
            // A label on a line of its own names the next instruction.
            if let Some(label) = label {
                self.require_origin(line)?;
                self.define(label, line);
            }
            return Ok(());
        }

        let (first, operand) = split_first(command);
        let mnemonic = match Mnemonic::lookup(first) {
            Some(m) => m,
            None => {
                return Err(Error::UnknownMnemonic { line, mnemonic: first.to_string() });
            }
        };

        if mnemonic != Mnemonic::Directive(Directive::Orig) {
            self.require_origin(line)?;
            if let Some(label) = label {
                self.define(label, line);
            }
        }

        match mnemonic {
            Mnemonic::Directive(Directive::Orig) => self.origin(label, operand, line)?,
            Mnemonic::Directive(Directive::End) => {
                debug!("line {}: .END at x{:04X}", line, self.address);
                self.state = State::Done;
            }
            Mnemonic::Operation(_) | Mnemonic::Trap(_) => {
                self.record(command, RecordKind::Operation, line, 1);
            }
            Mnemonic::Directive(Directive::Fill) => {
                let value = parse_number(operand)
                    .ok_or_else(|| Error::InvalidFill { line, operand: operand.to_string() })?;
                if value < FILL_MIN || value > FILL_MAX {
                    return Err(Error::FillOutOfRange { line, value });
                }
                self.record(command, RecordKind::Pseudo, line, 1);
            }
            Mnemonic::Directive(Directive::Blkw) => {
                let count = parse_number(operand)
                    .ok_or_else(|| Error::InvalidBlock { line, operand: operand.to_string() })?;
                if count <= 0 || count > BLKW_MAX {
                    return Err(Error::BlockOutOfRange { line, value: count });
                }
                self.record(command, RecordKind::Pseudo, line, count as u16);
            }
            Mnemonic::Directive(Directive::Stringz) => {
                let invalid = || Error::InvalidString { line, operand: operand.to_string() };
                let bytes = parse_string_literal(operand).ok_or_else(invalid)?;
                // One word per character plus the terminator.
                let size = u16::try_from(bytes.len())
                    .ok()
                    .and_then(|len| len.checked_add(1))
                    .ok_or_else(invalid)?;
                self.record(command, RecordKind::Pseudo, line, size);
            }
        }

        Ok(())
    }

    fn origin(&mut self, label: Option<&str>, operand: &str, line: usize) -> Result<(), Error> {
        let origin = parse_number(operand)
            .ok_or_else(|| Error::InvalidOrigin { line, operand: operand.to_string() })?;

        if self.state == State::InProgram {
            warn!(
                "line {}: .ORIG moves the address counter from x{:04X} to x{:04X}",
                line, self.address, origin as u16
            );
        }

        self.address = origin as u16;
        self.state = State::InProgram;
        info!("line {}: program origin x{:04X}", line, self.address);

        if let Some(label) = label {
            self.define(label, line);
        }
        Ok(())
    }

    fn require_origin(&self, line: usize) -> Result<(), Error> {
        if self.state == State::BeforeOrigin {
            Err(Error::BeforeOrigin { line })
        } else {
            Ok(())
        }
    }

    fn define(&mut self, label: &str, line: usize) {
        match self.symbols.define(label, self.address, line) {
            Some(prev) => warn!(
                "line {}: label `{}` redefined (was x{:04X} on line {}, now x{:04X})",
                line, label, prev.address, prev.line, self.address
            ),
            None => debug!("line {}: label `{}` = x{:04X}", line, label, self.address),
        }
    }

    fn record(&mut self, text: &str, kind: RecordKind, line: usize, size: u16) {
        let record = Record { address: self.address, text: text.to_string(), kind, line };
        debug!("line {}: {} ({} word(s))", line, record, size);
        self.records.push(record);
        self.address = self.address.wrapping_add(size);
    }
}

/// Separates a leading label from the instruction text.
///
/// The first token is a label unless it is a directive, operation or
/// trap alias. Returns the label (if any) and the remaining text, which
/// is empty for a label-only line.
fn split_label(formatted: &str, line: usize) -> Result<(Option<&str>, &str), Error> {
    let (first, rest) = split_first(formatted);
    if Mnemonic::lookup(first).is_some() {
        return Ok((None, formatted));
    }
    if !is_valid_label(first) {
        return Err(Error::InvalidLabel { line, label: first.to_string() });
    }
    Ok((Some(first), rest))
}
