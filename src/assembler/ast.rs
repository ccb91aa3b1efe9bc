//! The LC-3 instruction set as the assembler sees it.
//!
//! Comments are prefixed with semicolons (;) and are single-line only.
//! Instructions are delimited by newlines, operands by commas or spaces.
//! Mnemonics, registers and labels are case-insensitive.
//!
//! Supported directives:
//!
//! ```nasm
//! .ORIG x3000      ; first address of the program
//! .FILL #-1        ; one literal word
//! .BLKW 4          ; four zero words
//! .STRINGZ "Hi"    ; one word per character plus a zero terminator
//! .END             ; everything below is ignored
//! ```
//!
//! Supported operations:
//!
//! ```nasm
//! ADD DR, SR1, SR2 | ADD DR, SR1, imm5
//! AND DR, SR1, SR2 | AND DR, SR1, imm5
//! BR[n][z][p] LABEL ; bare BR branches unconditionally
//! JMP BaseR
//! JSR LABEL
//! JSRR BaseR
//! LD  DR, LABEL
//! LDI DR, LABEL
//! LDR DR, BaseR, offset6
//! LEA DR, LABEL
//! NOT DR, SR
//! RET
//! RTI
//! ST  SR, LABEL
//! STI SR, LABEL
//! STR SR, BaseR, offset6
//! TRAP trapvect8
//! ```
//!
//! Trap aliases (`GETC`, `OUT`, `PUTS`, `IN`, `PUTSP`, `HALT`) stand for a
//! complete `TRAP` word and take no operands.

use std::fmt;
use std::str::FromStr;

/// Assembler directives.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Directive {
    Orig,
    End,
    Stringz,
    Fill,
    Blkw,
}

impl FromStr for Directive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Directive::*;
        match s {
            ".ORIG" => Ok(Orig),
            ".END" => Ok(End),
            ".STRINGZ" => Ok(Stringz),
            ".FILL" => Ok(Fill),
            ".BLKW" => Ok(Blkw),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Directive::*;
        let name = match self {
            Orig => ".ORIG",
            End => ".END",
            Stringz => ".STRINGZ",
            Fill => ".FILL",
            Blkw => ".BLKW",
        };
        write!(f, "{}", name)
    }
}

/// One operand slot of an operation, with the bit position of its
/// least significant bit inside the word.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Field {
    /// A 3-bit register number.
    Register(u8),
    /// Third operand of ADD/AND: `000` + register, or `1` + imm5.
    /// Always occupies the low 6 bits.
    RegisterOrImm5,
    /// A PC-relative offset of the given width, in the low bits.
    PcOffset(u8),
    /// The 6-bit offset of LDR/STR, in the low bits.
    Offset6,
    /// The 8-bit vector of TRAP, in the low bits.
    TrapVector,
}

impl Field {
    /// Number of bits the operand value occupies.
    pub fn width(&self) -> u8 {
        match self {
            Field::Register(_) => 3,
            Field::RegisterOrImm5 => 5,
            Field::PcOffset(width) => *width,
            Field::Offset6 => 6,
            Field::TrapVector => 8,
        }
    }
}

/// A catalog entry: the fixed bits of the instruction word and the
/// operands that fill in the rest.
#[derive(PartialEq, Eq, Debug)]
pub struct Operation {
    pub mnemonic: &'static str,
    /// Every bit that does not come from an operand.
    pub template: u16,
    pub fields: &'static [Field],
}

impl Operation {
    /// Looks up an operation by its (uppercase) mnemonic.
    pub fn lookup(mnemonic: &str) -> Option<&'static Operation> {
        OPERATIONS.iter().find(|op| op.mnemonic == mnemonic)
    }

    /// Number of operands the operation requires.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic)
    }
}

const DR_SR_OP: &[Field] = &[Field::Register(9), Field::Register(6), Field::RegisterOrImm5];
const BRANCH: &[Field] = &[Field::PcOffset(9)];
const BASE: &[Field] = &[Field::Register(6)];
const REG_PC9: &[Field] = &[Field::Register(9), Field::PcOffset(9)];
const BASE_OFFSET: &[Field] = &[Field::Register(9), Field::Register(6), Field::Offset6];

/// All operations, in opcode-table order.
pub static OPERATIONS: &[Operation] = &[
    Operation { mnemonic: "ADD", template: 0b0001_000_000_000000, fields: DR_SR_OP },
    Operation { mnemonic: "AND", template: 0b0101_000_000_000000, fields: DR_SR_OP },
    Operation { mnemonic: "BR", template: 0b0000_111_000000000, fields: BRANCH },
    Operation { mnemonic: "BRN", template: 0b0000_100_000000000, fields: BRANCH },
    Operation { mnemonic: "BRZ", template: 0b0000_010_000000000, fields: BRANCH },
    Operation { mnemonic: "BRP", template: 0b0000_001_000000000, fields: BRANCH },
    Operation { mnemonic: "BRNZ", template: 0b0000_110_000000000, fields: BRANCH },
    Operation { mnemonic: "BRNP", template: 0b0000_101_000000000, fields: BRANCH },
    Operation { mnemonic: "BRZP", template: 0b0000_011_000000000, fields: BRANCH },
    Operation { mnemonic: "BRNZP", template: 0b0000_111_000000000, fields: BRANCH },
    Operation { mnemonic: "JMP", template: 0b1100_000_000_000000, fields: BASE },
    Operation { mnemonic: "JSR", template: 0b0100_1_00000000000, fields: &[Field::PcOffset(11)] },
    Operation { mnemonic: "JSRR", template: 0b0100_0_00_000_000000, fields: BASE },
    Operation { mnemonic: "LD", template: 0b0010_000_000000000, fields: REG_PC9 },
    Operation { mnemonic: "LDI", template: 0b1010_000_000000000, fields: REG_PC9 },
    Operation { mnemonic: "LDR", template: 0b0110_000_000_000000, fields: BASE_OFFSET },
    Operation { mnemonic: "LEA", template: 0b1110_000_000000000, fields: REG_PC9 },
    Operation {
        mnemonic: "NOT",
        template: 0b1001_000_000_111111,
        fields: &[Field::Register(9), Field::Register(6)],
    },
    Operation { mnemonic: "RET", template: 0b1100_000_111_000000, fields: &[] },
    Operation { mnemonic: "RTI", template: 0b1000_000000000000, fields: &[] },
    Operation { mnemonic: "ST", template: 0b0011_000_000000000, fields: REG_PC9 },
    Operation { mnemonic: "STI", template: 0b1011_000_000000000, fields: REG_PC9 },
    Operation { mnemonic: "STR", template: 0b0111_000_000_000000, fields: BASE_OFFSET },
    Operation { mnemonic: "TRAP", template: 0b1111_0000_00000000, fields: &[Field::TrapVector] },
];

/// A named trap service and the complete word it assembles to.
#[derive(PartialEq, Eq, Debug)]
pub struct TrapRoutine {
    pub name: &'static str,
    pub word: u16,
}

impl TrapRoutine {
    pub fn lookup(name: &str) -> Option<&'static TrapRoutine> {
        TRAP_ROUTINES.iter().find(|trap| trap.name == name)
    }
}

pub static TRAP_ROUTINES: &[TrapRoutine] = &[
    TrapRoutine { name: "GETC", word: 0xF020 },
    TrapRoutine { name: "OUT", word: 0xF021 },
    TrapRoutine { name: "PUTS", word: 0xF022 },
    TrapRoutine { name: "IN", word: 0xF023 },
    TrapRoutine { name: "PUTSP", word: 0xF024 },
    TrapRoutine { name: "HALT", word: 0xF025 },
];

/// Anything that may start an instruction.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    Directive(Directive),
    Operation(&'static Operation),
    Trap(&'static TrapRoutine),
}

impl Mnemonic {
    pub fn lookup(token: &str) -> Option<Mnemonic> {
        if let Ok(dir) = token.parse::<Directive>() {
            return Some(Mnemonic::Directive(dir));
        }
        if let Some(op) = Operation::lookup(token) {
            return Some(Mnemonic::Operation(op));
        }
        TrapRoutine::lookup(token).map(Mnemonic::Trap)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RecordKind {
    Operation,
    Pseudo,
}

/// One instruction laid out by the first pass.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Record {
    pub address: u16,
    /// Formatted instruction text with any label removed.
    pub text: String,
    pub kind: RecordKind,
    /// 1-based source line.
    pub line: usize,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{:04X} {}", self.address, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_from_str() {
        assert_eq!(".ORIG".parse::<Directive>(), Ok(Directive::Orig));
        assert_eq!(".END".parse::<Directive>(), Ok(Directive::End));
        assert_eq!(".STRINGZ".parse::<Directive>(), Ok(Directive::Stringz));
        assert_eq!(".FILL".parse::<Directive>(), Ok(Directive::Fill));
        assert_eq!(".BLKW".parse::<Directive>(), Ok(Directive::Blkw));

        assert_eq!(".orig".parse::<Directive>(), Err(()));
        assert_eq!("ORIG".parse::<Directive>(), Err(()));
        assert_eq!(Directive::Stringz.to_string(), ".STRINGZ");
    }

    #[test]
    fn test_fields_fill_the_word() {
        // Template bits and operand bits never overlap, and together with
        // the fixed zero bits of each format they cover exactly 16 bits.
        for op in OPERATIONS {
            let mut mask: u32 = 0;
            for field in op.fields {
                let (shift, width) = match field {
                    Field::Register(shift) => (*shift as u32, 3),
                    Field::RegisterOrImm5 => (0, 6),
                    other => (0, other.width() as u32),
                };
                let bits = ((1u32 << width) - 1) << shift;
                assert_eq!(mask & bits, 0, "{} has overlapping fields", op);
                mask |= bits;
            }
            assert!(mask <= 0xFFFF, "{} does not fit in a word", op);
            assert_eq!(op.template as u32 & mask, 0, "{} template overlaps an operand", op);
        }
    }

    #[test]
    fn test_operation_lookup() {
        let add = Operation::lookup("ADD").unwrap();
        assert_eq!(add.template, 0x1000);
        assert_eq!(add.arity(), 3);

        assert_eq!(Operation::lookup("BR").unwrap().template, 0x0E00);
        assert_eq!(Operation::lookup("BRNZP").unwrap().template, 0x0E00);
        assert_eq!(Operation::lookup("BRN").unwrap().template, 0x0800);
        assert_eq!(Operation::lookup("RET").unwrap().template, 0xC1C0);
        assert_eq!(Operation::lookup("RET").unwrap().arity(), 0);
        assert_eq!(Operation::lookup("JSR").unwrap().fields, &[Field::PcOffset(11)]);

        assert_eq!(Operation::lookup("add"), None);
        assert_eq!(Operation::lookup("HALT"), None);
        assert_eq!(OPERATIONS.len(), 24);
    }

    #[test]
    fn test_record_display() {
        let record = Record {
            address: 0x3001,
            text: "BRNZP LOOP".to_string(),
            kind: RecordKind::Operation,
            line: 3,
        };
        assert_eq!(record.to_string(), "x3001 BRNZP LOOP");
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Mnemonic::lookup(".FILL"), Some(Mnemonic::Directive(Directive::Fill)));
        assert!(matches!(Mnemonic::lookup("LEA"), Some(Mnemonic::Operation(_))));
        assert!(matches!(
            Mnemonic::lookup("HALT"),
            Some(Mnemonic::Trap(TrapRoutine { word: 0xF025, .. }))
        ));
        assert!(matches!(
            Mnemonic::lookup("GETC"),
            Some(Mnemonic::Trap(TrapRoutine { word: 0xF020, .. }))
        ));
        assert_eq!(Mnemonic::lookup("LOOP"), None);
        assert_eq!(Mnemonic::lookup("NOP"), None);
    }
}
