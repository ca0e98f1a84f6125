use crate::opcode::Opcode;
use crate::registers::Register;
use std::fmt::Write;

/// The minimum run of printable bytes (before the NUL) rendered as a DEFSTR.
const MIN_STRING_RUN: usize = 3;
/// The longest byte run considered for string detection.
const MAX_STRING_RUN: usize = 50;

/// One decoded unit of a binary image: an instruction, a detected string, or a
/// raw data byte.
#[derive(Clone, Debug, PartialEq)]
pub struct DisassembledLine {
    /// The address of the first byte (including any `--org` base)
    pub address: u16,
    /// The raw bytes the line covers
    pub bytes: Vec<u8>,
    /// The reconstructed assembly text (`MNEMONIC operands`, `DEFSTR "..."`, or
    /// `DB 0xNN` for undecodable bytes)
    pub text: String,
}

impl DisassembledLine {
    /// Formats the line the way the CLI prints it:
    /// `address: hexbytes  MNEMONIC operands`.
    pub fn formatted(&self) -> String {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        let mut hex = hex.join(" ");
        if hex.len() > 24 {
            hex.truncate(21);
            hex.push_str("...");
        }
        format!("{:04X}: {:<24}  {}", self.address, hex, self.text)
    }
}

/// A cursor over the binary image that mirrors the CPU's operand fetch order.
struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.position)?;
        self.position += 1;
        Some(byte)
    }

    fn next_word(&mut self) -> Option<u16> {
        let high = self.next_byte()?;
        let low = self.next_byte()?;
        Some(((high as u16) << 8) | low as u16)
    }
}

/// Disassembles a binary image into one line per instruction (or data run).
///
/// Runs of at least three printable bytes followed by a NUL render as `DEFSTR`
/// directives; unknown opcode bytes render as `DB`.  The `org_base` offsets all
/// printed addresses, matching an image assembled at an ORG other than zero.
pub fn disassemble(image: &[u8], org_base: u16) -> Vec<DisassembledLine> {
    let mut lines = Vec::new();
    let mut position = 0;
    while position < image.len() {
        let address = org_base.wrapping_add(position as u16);
        if let Some(length) = string_run_length(&image[position..]) {
            lines.push(DisassembledLine {
                address,
                bytes: image[position..position + length].to_vec(),
                text: format_string(&image[position..position + length - 1]),
            });
            position += length;
            continue;
        }
        match decode_instruction(&image[position..]) {
            Some((length, text)) => {
                lines.push(DisassembledLine {
                    address,
                    bytes: image[position..position + length].to_vec(),
                    text,
                });
                position += length;
            }
            None => {
                lines.push(DisassembledLine {
                    address,
                    bytes: vec![image[position]],
                    text: format!("DB 0x{:02X}", image[position]),
                });
                position += 1;
            }
        }
    }
    lines
}

/// Returns the length (terminator included) of a leading printable string run, if
/// the bytes at the cursor look like string data.
fn string_run_length(bytes: &[u8]) -> Option<usize> {
    let mut length = 0;
    for byte in bytes {
        match byte {
            0 => {
                return if length >= MIN_STRING_RUN {
                    Some(length + 1)
                } else {
                    None
                };
            }
            0x20..=0x7E => {
                length += 1;
                if length > MAX_STRING_RUN {
                    return None;
                }
            }
            _ => return None,
        }
    }
    None
}

/// Renders detected string data as a DEFSTR directive with escaped quotes and
/// backslashes.
fn format_string(content: &[u8]) -> String {
    let mut text = String::from("DEFSTR \"");
    for byte in content {
        match byte {
            b'"' => text.push_str("\\\""),
            b'\\' => text.push_str("\\\\"),
            _ => text.push(*byte as char),
        }
    }
    text.push('"');
    text
}

/// Decodes one instruction, returning its total length and reconstructed text, or
/// `None` when the bytes do not form a complete instruction.
fn decode_instruction(bytes: &[u8]) -> Option<(usize, String)> {
    let mut reader = Reader { bytes, position: 0 };
    let opcode = Opcode::decode_from(reader.next_byte()?).ok()?;
    if !opcode.takes_mode_byte() {
        return Some((reader.position, opcode.mnemonic().to_string()));
    }
    let mode = reader.next_byte()?;
    let indexed = mode & (1 << 6) != 0;
    let direct = mode & (1 << 7) != 0;
    let mut operands: Vec<String> = Vec::new();
    for i in 0..opcode.operand_count() {
        if i >= 3 {
            operands.push(format!("0x{:02X}", reader.next_byte()?));
            continue;
        }
        let class = (mode >> (i * 2)) & 0x03;
        let operand = match class {
            0 => register_name(reader.next_byte()?),
            1 => format!("0x{:02X}", reader.next_byte()?),
            2 => format!("0x{:04X}", reader.next_word()?),
            _ => decode_memory_operand(&mut reader, direct, indexed)?,
        };
        operands.push(operand);
    }
    let mut text = opcode.mnemonic().to_string();
    if !operands.is_empty() {
        let _ = write!(text, " {}", operands.join(", "));
    }
    Some((reader.position, text))
}

fn register_name(code: u8) -> String {
    match Register::from_code(code) {
        Ok(register) => register.name(),
        Err(_) => format!("0x{:02X}", code),
    }
}

/// Reconstructs a class-3 memory operand under the (direct, indexed) sub-mode,
/// printing index bytes as signed offsets.
fn decode_memory_operand(reader: &mut Reader, direct: bool, indexed: bool) -> Option<String> {
    match (direct, indexed) {
        (true, false) => Some(format!("[0x{:04X}]", reader.next_word()?)),
        (false, false) => Some(format!("[{}]", register_name(reader.next_byte()?))),
        (false, true) => {
            let register = register_name(reader.next_byte()?);
            let offset = reader.next_byte()? as i8;
            Some(format_indexed(&register, offset))
        }
        (true, true) => {
            let address = reader.next_word()?;
            let offset = reader.next_byte()? as i8;
            Some(format_indexed(&format!("0x{:04X}", address), offset))
        }
    }
}

fn format_indexed(base: &str, offset: i8) -> String {
    if offset == 0 {
        format!("[{}]", base)
    } else if offset < 0 {
        format!("[{}-{}]", base, -(offset as i16))
    } else {
        format!("[{}+{}]", base, offset)
    }
}
