//! The Assembler module is in charge of taking an
//! LC-3 source file and producing its machine-code image.
//!
//! It does this in two passes: [`layout`] assigns addresses and
//! collects labels, then [`encoder`] turns every instruction into
//! 16-bit words once all labels are known.

pub mod ast;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod lexer;
pub mod symbols;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use self::ast::Record;
use self::encoder::Encoder;
use self::error::{EncodeError, Error};
use self::layout::Layout;
use self::lexer::{to_binary16, to_hex, WORD_BITS};
use self::symbols::SymbolTable;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    /// Sixteen `0`/`1` characters per word.
    Binary,
    /// Four hex digits per word.
    Hex,
}

impl OutputFormat {
    /// Extension used when no output path is given.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Binary => "bin",
            OutputFormat::Hex => "hex",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Binary
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Config {
    pub format: OutputFormat,
    /// Log every offending line with its source text.
    pub error_log: bool,
}

/// One emitted machine word.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Word {
    pub address: u16,
    pub value: u16,
    /// 1-based source line that produced the word.
    pub line: usize,
    /// Instruction text, set only on the first word of each instruction.
    pub source: Option<String>,
}

impl Word {
    pub fn render(&self, format: OutputFormat) -> String {
        let bin = to_binary16(self.value as i32);
        match format {
            OutputFormat::Binary => bin,
            OutputFormat::Hex => to_hex(&bin),
        }
    }
}

/// Renders the image: one word per line, newline-terminated.
pub fn render(words: &[Word], format: OutputFormat) -> String {
    let mut out = String::with_capacity(words.len() * (WORD_BITS + 1));
    for word in words {
        out.push_str(&word.render(format));
        out.push('\n');
    }
    out
}

/// A single assembly run. The symbol table and records live exactly as
/// long as the assembler does.
pub struct Assembler {
    config: Config,
    symbols: SymbolTable,
    records: Vec<Record>,
}

impl Assembler {
    pub fn new(config: Config) -> Self {
        Assembler { config, symbols: SymbolTable::new(), records: Vec::new() }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Scan #1: lay out the program and build the symbol table.
    /// On failure nothing from the scan is kept.
    pub fn first_pass<R: Read>(&mut self, reader: R) -> Result<(), Error> {
        let mut symbols = SymbolTable::new();
        let records = Layout::new(&mut symbols, self.config.error_log).run(reader)?;

        self.symbols = symbols;
        self.records = records;
        Ok(())
    }

    /// Scan #2: encode every record. All bad instructions are reported
    /// before giving up.
    pub fn second_pass(&self) -> Result<Vec<Word>, Error> {
        let encoder = Encoder::new(&self.symbols);
        let mut words = Vec::with_capacity(self.records.len());
        let mut errors: Vec<EncodeError> = Vec::new();

        for record in &self.records {
            match encoder.encode(record) {
                Ok(values) => {
                    for (idx, value) in values.into_iter().enumerate() {
                        words.push(Word {
                            address: record.address.wrapping_add(idx as u16),
                            value,
                            line: record.line,
                            source: if idx == 0 { Some(record.text.clone()) } else { None },
                        });
                    }
                }
                Err(kind) => {
                    let err = EncodeError { line: record.line, text: record.text.clone(), kind };
                    if self.config.error_log {
                        error!("{}", err);
                    }
                    errors.push(err);
                }
            }
        }

        if !errors.is_empty() {
            error!("Stopped assembly due to {} encoding error(s).", errors.len());
            return Err(Error::Encode(errors));
        }

        info!("second pass: {} word(s)", words.len());
        Ok(words)
    }

    /// Runs both passes over in-memory source.
    pub fn assemble_source(mut self, source: &[u8]) -> Result<Vec<Word>, Error> {
        self.first_pass(source)?;
        self.second_pass()
    }

    /// Assembles `input` into `output`. The output file is only created
    /// once both passes have succeeded.
    pub fn assemble(mut self, input: &Path, output: &Path) -> Result<Vec<Word>, Error> {
        let ifile = File::open(input)
            .map_err(|source| Error::OpenInput { path: input.to_path_buf(), source })?;
        self.first_pass(ifile)?;
        let words = self.second_pass()?;

        let mut ofile = File::create(output)
            .map_err(|source| Error::OpenOutput { path: output.to_path_buf(), source })?;
        ofile
            .write_all(render(&words, self.config.format).as_bytes())
            .map_err(|source| Error::WriteOutput { path: output.to_path_buf(), source })?;

        info!("wrote {} word(s) to `{}`", words.len(), output.display());
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn assemble(src: &str) -> Result<Vec<Word>, Error> {
        Assembler::new(Config::default()).assemble_source(src.as_bytes())
    }

    fn values(words: &[Word]) -> Vec<u16> {
        words.iter().map(|w| w.value).collect()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lc3asm-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_loop_scenario() {
        let words = assemble(".ORIG x3000\nLOOP ADD R0,R0,R0\nBRnzp LOOP\n.END").unwrap();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].address, 0x3000);
        assert_eq!(words[1].address, 0x3001);
        assert_eq!(words[0].render(OutputFormat::Binary), "0001000000000000");
        assert_eq!(words[1].render(OutputFormat::Binary), "0000111111111110");
    }

    #[test]
    fn test_stringz_scenario() {
        let words = assemble(".ORIG x3000\n.STRINGZ \"HI\"\n.END").unwrap();
        assert_eq!(values(&words), vec![0x48, 0x49, 0]);
        assert_eq!(words[0].source.as_deref(), Some(".STRINGZ \"HI\""));
        assert_eq!(words[1].source, None);
        assert_eq!(words[2].address, 0x3002);
    }

    #[test]
    fn test_string_literals_keep_their_case() {
        // Everything outside the quotes is case-insensitive; the payload is not.
        let words = assemble(".orig x3000\nmsg .stringz \"hi\"\n.end").unwrap();
        assert_eq!(values(&words), vec![b'h' as u16, b'i' as u16, 0]);
        assert_eq!(words[0].source.as_deref(), Some(".STRINGZ \"hi\""));
    }

    #[test]
    fn test_trap_and_halt_agree() {
        let words = assemble(".ORIG x3000\nTRAP x25\nHALT\n.END").unwrap();
        assert_eq!(words[0].render(OutputFormat::Binary), "1111000000100101");
        assert_eq!(words[1].render(OutputFormat::Binary), "1111000000100101");
    }

    #[test]
    fn test_forward_reference() {
        let words = assemble(
            "
            .ORIG x3000
                    LD R1, VALUE
                    BRz DONE
                    ADD R1, R1, #-1
            DONE    HALT
            VALUE   .FILL #7
            .END
            ",
        )
        .unwrap();

        assert_eq!(
            values(&words),
            vec![
                0b0010_001_000000011, // VALUE is x3004, 3 past x3001
                0b0000_010_000000001,
                0b0001_001_001_1_11111,
                0xF025,
                7,
            ]
        );
    }

    #[test]
    fn test_addresses_after_data() {
        // Strings and blocks must not shift later labels.
        let words = assemble(
            r#"
            .ORIG x3000
            MSG   .STRINGZ "Hello, World; ok"
            BUF   .BLKW 2
                  LEA R0, MSG
                  LEA R1, BUF
                  PUTS
                  HALT
            .END
            "#,
        )
        .unwrap();

        let lea = words.iter().position(|w| w.source.as_deref() == Some("LEA R0 MSG")).unwrap();
        assert_eq!(lea, 17 + 2);
        assert_eq!(words[lea].address, 0x3013);
        assert_eq!(words[lea].value & 0x1FF, truncate9(0x3000 - 0x3013 - 1));
        assert_eq!(words[lea + 1].value & 0x1FF, truncate9(0x3011 - 0x3014 - 1));
        assert_eq!(words[0].value, b'H' as u16);
        assert_eq!(words[1].value, b'e' as u16);
    }

    fn truncate9(v: i32) -> u16 {
        encoder::truncate(v, 9)
    }

    #[test]
    fn test_encode_errors_are_collected() {
        let err = assemble(".ORIG x3000\nADD R0 R0\nJMP LOOP\nHALT\n.END").unwrap_err();
        match &err {
            Error::Encode(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].line, 2);
                assert_eq!(errors[1].line, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.code(), -30);
    }

    #[test]
    fn test_render_formats() {
        let words = assemble(".ORIG x3000\nHALT\n.FILL #-1\n.BLKW 2\n.END").unwrap();
        assert_eq!(
            render(&words, OutputFormat::Binary),
            "1111000000100101\n1111111111111111\n0000000000000000\n0000000000000000\n"
        );
        assert_eq!(render(&words, OutputFormat::Hex), "F025\nFFFF\n0000\n0000\n");
    }

    #[test]
    fn test_every_word_is_sixteen_bits() {
        let words = assemble(
            ".ORIG x3000\nNOT R1 R2\nLDR R0 R1 #31\nTRAP xFF\n.STRINGZ \"~\"\nRTI\n.END",
        )
        .unwrap();
        for word in &words {
            assert_eq!(word.render(OutputFormat::Binary).len(), 16);
            assert_eq!(word.render(OutputFormat::Hex).len(), 4);
        }
    }

    #[test]
    fn test_assemble_files() {
        let input = temp_path("prog.asm");
        let output = temp_path("prog.bin");
        fs::write(&input, ".orig x3000\n  and r0, r0, #0 ; clear\n  halt\n.end\n").unwrap();

        let config = Config { format: OutputFormat::Hex, error_log: false };
        Assembler::new(config).assemble(&input, &output).unwrap();
        let first = fs::read(&output).unwrap();
        assert_eq!(String::from_utf8(first.clone()).unwrap(), "5020\nF025\n");

        // Same source, same flags, same bytes.
        Assembler::new(config).assemble(&input, &output).unwrap();
        assert_eq!(fs::read(&output).unwrap(), first);

        fs::remove_file(&input).ok();
        fs::remove_file(&output).ok();
    }

    #[test]
    fn test_no_output_on_failure() {
        let input = temp_path("bad.asm");
        let output = temp_path("bad.bin");
        fs::remove_file(&output).ok();
        fs::write(&input, ".ORIG x3000\n.FILL 70000\n.END\n").unwrap();

        let err = Assembler::new(Config::default()).assemble(&input, &output).unwrap_err();
        assert_eq!(err.code(), -5);
        assert!(!output.exists());

        fs::remove_file(&input).ok();
    }

    #[test]
    fn test_missing_input() {
        let err = Assembler::new(Config::default())
            .assemble(&temp_path("does-not-exist.asm"), &temp_path("never.bin"))
            .unwrap_err();
        assert!(matches!(err, Error::OpenInput { .. }));
        assert_eq!(err.code(), -1);
    }
}
