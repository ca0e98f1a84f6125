use std::error;
use std::fmt;

/// An Error enum used throughout the nova16 crate to communicate details of runtime
/// errors that have occurred.
///
/// Instances of [ErrorDetail] are bubbled-up to the hosting application through the public
/// API methods.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorDetail {
    /// An unrecognised opcode was read from memory
    UnknownOpcode { opcode: u8 },
    /// An operand byte referenced a register code outside the encoding table
    UnknownRegisterCode { code: u8 },
    /// A register that cannot hold an address was used for indirect or indexed addressing
    InvalidIndirectRegister { code: u8 },
    /// A division or modulo instruction was executed with a zero divisor
    DivisionByZero,
    /// A pop-style operation found insufficient data on the stack
    StackUnderflow { sp: u16 },
    /// A push-style operation would wrap SP or clobber the interrupt vector table
    StackOverflow { sp: u16 },
    /// An attempt was made to read/write a word beyond the addressable range
    MemoryAddressOutOfBounds { address: u32 },
    /// Error used for any file I/O issues
    FileError { file_path: String },
}

impl error::Error for ErrorDetail {}

impl fmt::Display for ErrorDetail {
    /// Returns a textual description of each enum variant for display purposes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::UnknownOpcode { opcode } => {
                write!(f, "an unrecognised opcode {:#04X} was decoded", opcode)
            }
            ErrorDetail::UnknownRegisterCode { code } => {
                write!(f, "an unknown register code {:#04X} was decoded", code)
            }
            ErrorDetail::InvalidIndirectRegister { code } => {
                write!(
                    f,
                    "register code {:#04X} cannot be used for indirect addressing",
                    code
                )
            }
            ErrorDetail::DivisionByZero => {
                write!(f, "a division or modulo by zero was attempted")
            }
            ErrorDetail::StackUnderflow { sp } => {
                write!(f, "stack underflow with SP={:#06X}", sp)
            }
            ErrorDetail::StackOverflow { sp } => {
                write!(f, "stack overflow with SP={:#06X}", sp)
            }
            ErrorDetail::MemoryAddressOutOfBounds { address } => {
                write!(f, "invalid memory address {:#06X} was accessed", address)
            }
            ErrorDetail::FileError { file_path } => {
                write!(f, "invalid file path {} was specified", file_path)
            }
        }
    }
}

/// An Error struct used to bubble up nova16 errors to the hosting application.  This wraps
/// the more specific [ErrorDetail] error enum, and provides overall machine state context
/// at the point of the failure.
#[derive(Clone, Debug, PartialEq)]
pub struct NovaError {
    /// The program counter at the point the error was raised
    pub program_counter: u16,
    /// The number of instructions executed before the error was raised
    pub cycles: usize,
    /// The underlying error detail
    pub inner_error: ErrorDetail,
}

impl error::Error for NovaError {}

impl fmt::Display for NovaError {
    /// Returns a textual description of the error
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "an error occurred on cycle {}, with program_counter {:#06X}: ",
            self.cycles, self.program_counter
        )?;
        self.inner_error.fmt(f)
    }
}
