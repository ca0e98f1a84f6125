use crate::opcode::Opcode;
use crate::registers::Register;
use std::collections::HashMap;
use std::fmt;

/// One assembly diagnostic, tied to the source line that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on line {}: {}", self.line, self.message)
    }
}

/// One output segment, started by an ORG directive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// The load address of the segment
    pub start: u16,
    /// The segment length in bytes
    pub length: usize,
    /// The offset of the segment within the binary image
    pub offset: usize,
}

/// The result of a successful assembly: the binary image plus its segment map.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembly {
    pub binary: Vec<u8>,
    pub segments: Vec<Segment>,
}

impl Assembly {
    /// Returns true when the image needs a sidecar `.org` file to load correctly:
    /// more than one segment, or a single segment that does not start at 0 (the
    /// first record carries the entry point).
    pub fn needs_org_file(&self) -> bool {
        match self.segments.as_slice() {
            [] => false,
            [only] => only.start != 0,
            _ => true,
        }
    }

    /// Renders the `.org` sidecar contents: one `0xSSSS LEN OFF` record per segment.
    pub fn org_records(&self) -> String {
        let mut text = String::from("# ORG segment information\n");
        text.push_str("# Format: <start_address> <length> <binary_offset>\n");
        for segment in &self.segments {
            text.push_str(&format!(
                "0x{:04X} {} {}\n",
                segment.start, segment.length, segment.offset
            ));
        }
        text
    }
}

/// The classification an operand token resolves to; this drives both the mode byte
/// and the encoded size.
#[derive(Clone, Copy, Debug, PartialEq)]
enum OperandType {
    Register,
    Immediate8,
    Immediate16,
    RegisterIndirect,
    RegisterIndexed,
    Direct,
}

impl OperandType {
    /// The encoded size of this operand in bytes.
    fn encoded_size(&self) -> usize {
        match self {
            OperandType::Register => 1,
            OperandType::Immediate8 => 1,
            OperandType::Immediate16 => 2,
            OperandType::RegisterIndirect => 1,
            OperandType::RegisterIndexed => 2,
            OperandType::Direct => 2,
        }
    }

    /// The two-bit addressing class stored in the mode byte.
    fn mode_class(&self) -> u8 {
        match self {
            OperandType::Register => 0,
            OperandType::Immediate8 => 1,
            OperandType::Immediate16 => 2,
            _ => 3,
        }
    }
}

/// One parsed line of source: an optional label plus either a directive or an
/// instruction with operand tokens.
#[derive(Clone, Debug, Default)]
struct Line {
    number: usize,
    label: Option<String>,
    directive: Option<String>,
    directive_args: Vec<String>,
    instruction: Option<String>,
    operands: Vec<String>,
}

/// The Nova-16 two-pass assembler.
///
/// Pass one walks the source to build the symbol table (labels bound to the
/// location counter, EQU constants bound to their literal text) and computes exact
/// instruction sizes from classified operand types.  Pass two re-walks the source
/// emitting bytes and segment records.  Errors are collected with their line
/// numbers; any error suppresses all output.
pub struct Assembler {
    symbols: HashMap<String, String>,
    errors: Vec<AssemblyError>,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            symbols: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Assembles a complete source text.  On success returns the binary image and
    /// segment map; on failure returns every diagnostic collected across both
    /// passes.
    pub fn assemble(mut self, source: &str) -> Result<Assembly, Vec<AssemblyError>> {
        let lines = self.parse_source(source);
        self.first_pass(&lines);
        let assembly = self.second_pass(&lines);
        if self.errors.is_empty() {
            Ok(assembly)
        } else {
            Err(self.errors)
        }
    }

    /// Returns the symbol table built by pass one (labels as `0xNNNN` strings).
    pub fn symbols(&self) -> &HashMap<String, String> {
        &self.symbols
    }

    fn error(&mut self, line: usize, message: impl Into<String>) {
        self.errors.push(AssemblyError {
            line,
            message: message.into(),
        });
    }

    // ---- lexical analysis -------------------------------------------------------

    fn parse_source(&mut self, source: &str) -> Vec<Line> {
        source
            .lines()
            .enumerate()
            .filter_map(|(index, text)| self.parse_line(text, index + 1))
            .collect()
    }

    /// Parses one source line into its label/directive/instruction parts.
    fn parse_line(&mut self, text: &str, number: usize) -> Option<Line> {
        let text = strip_comment(text).trim();
        if text.is_empty() {
            return None;
        }
        let mut line = Line {
            number,
            ..Line::default()
        };
        let mut rest = text;

        // Leading label ("name:"), excluding the high-byte form "SYMBOL:" used as
        // an operand (a label must begin the line and be followed by nothing that
        // parses as part of the same token)
        if let Some(colon) = rest.find(':') {
            let candidate = &rest[..colon];
            if is_identifier(candidate) {
                line.label = Some(candidate.to_string());
                rest = rest[colon + 1..].trim();
            }
        }
        if rest.is_empty() {
            return Some(line);
        }

        let (head, tail) = match rest.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (rest, ""),
        };
        let head_upper = head.to_uppercase();

        // "<label> EQU <value>" with no colon on the label
        if line.label.is_none() {
            if let Some((value_head, value_tail)) = tail.split_once(char::is_whitespace) {
                if value_head.to_uppercase() == "EQU" {
                    line.label = Some(head.to_string());
                    line.directive = Some("EQU".to_string());
                    line.directive_args = vec![value_tail.trim().to_string()];
                    return Some(line);
                }
            }
        }

        match head_upper.as_str() {
            "ORG" | "EQU" => {
                line.directive = Some(head_upper);
                if !tail.is_empty() {
                    line.directive_args = vec![tail.to_string()];
                }
            }
            "DB" | "DW" | "DEFSTR" => {
                line.directive = Some(head_upper);
                line.directive_args = split_operands(tail);
            }
            _ => {
                line.instruction = Some(head_upper);
                line.operands = split_operands(tail);
            }
        }
        Some(line)
    }

    // ---- symbol and literal resolution ------------------------------------------

    /// Resolves a symbol table entry to its numeric value.
    fn symbol_value(&self, name: &str) -> Option<u32> {
        let text = self.symbols.get(name)?;
        parse_number(text)
    }

    /// Resolves a numeric token: a literal, or a symbol bound by pass one.
    fn resolve_value(&self, token: &str) -> Option<u32> {
        parse_number(token).or_else(|| self.symbol_value(token))
    }

    /// Classifies one operand token.  High/low-byte symbol references classify as
    /// 8-bit immediates on syntax alone, so forward references size identically in
    /// both passes.
    fn classify_operand(&self, operand: &str, line: usize) -> Result<OperandType, AssemblyError> {
        let fail = |message: String| AssemblyError { line, message };
        if Register::from_name(operand).is_some() {
            return Ok(OperandType::Register);
        }
        if let Some(inner) = operand.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let inner = inner.trim();
            if let Some((base, _offset)) = split_index_expression(inner) {
                if parse_number(base).is_some() {
                    return Err(fail(format!(
                        "direct indexed memory access [{}] is not supported; \
                         load the address into a register first",
                        inner
                    )));
                }
                if base_register_code(base).is_none() {
                    return Err(fail(format!("unknown base register in [{}]", inner)));
                }
                return Ok(OperandType::RegisterIndexed);
            }
            if parse_number(inner).is_some() {
                return Ok(OperandType::Direct);
            }
            if base_register_code(inner).is_some() {
                return Ok(OperandType::RegisterIndirect);
            }
            return Err(fail(format!("malformed memory operand [{}]", inner)));
        }
        if let Some(name) = operand.strip_suffix(':') {
            if is_identifier(name) {
                return Ok(OperandType::Immediate8);
            }
        }
        if let Some(name) = operand.strip_prefix(':') {
            if is_identifier(name) {
                return Ok(OperandType::Immediate8);
            }
        }
        if self.symbols.contains_key(operand) {
            return Ok(OperandType::Immediate16);
        }
        if let Some(value) = parse_number(operand) {
            return Ok(if value > 127 {
                OperandType::Immediate16
            } else {
                OperandType::Immediate8
            });
        }
        // Unresolved symbols default to 16-bit immediates; pass two reports them
        // if they never materialise
        Ok(OperandType::Immediate16)
    }

    // ---- pass one ---------------------------------------------------------------

    /// Builds the symbol table and assigns each label the current location counter.
    fn first_pass(&mut self, lines: &[Line]) {
        let mut location: u32 = 0;
        for line in lines {
            if let Some(label) = &line.label {
                if line.directive.as_deref() != Some("EQU") {
                    self.symbols
                        .insert(label.clone(), format!("0x{:04X}", location));
                }
            }
            match line.directive.as_deref() {
                Some("ORG") => {
                    if let Some(arg) = line.directive_args.first() {
                        match parse_org_address(arg) {
                            Some(address) => location = address as u32,
                            None => self.error(line.number, format!("invalid ORG address {}", arg)),
                        }
                    } else {
                        self.error(line.number, "ORG requires an address");
                    }
                }
                Some("EQU") => match (&line.label, line.directive_args.first()) {
                    (Some(label), Some(value)) => {
                        self.symbols.insert(label.clone(), value.clone());
                    }
                    _ => self.error(line.number, "EQU requires a label and a value"),
                },
                Some("DB") => location += self.db_size(line),
                Some("DW") => location += line.directive_args.len() as u32 * 2,
                Some("DEFSTR") => location += self.defstr_size(line),
                _ => {
                    if line.instruction.is_some() {
                        location += self.instruction_size(line);
                    }
                }
            }
        }
    }

    fn db_size(&mut self, line: &Line) -> u32 {
        let mut size = 0;
        for arg in &line.directive_args {
            if is_string_literal(arg) {
                size += parse_string_literal(arg).len() as u32;
            } else {
                size += 1;
            }
        }
        size
    }

    fn defstr_size(&mut self, line: &Line) -> u32 {
        match line.directive_args.first() {
            Some(arg) if is_string_literal(arg) => parse_string_literal(arg).len() as u32 + 1,
            _ => 1,
        }
    }

    /// Computes the exact encoded size of one instruction from its classified
    /// operand types.  Sizing needs no relaxation: every class has a fixed size.
    fn instruction_size(&mut self, line: &Line) -> u32 {
        let mnemonic = line.instruction.as_deref().unwrap_or_default();
        let opcode = match Opcode::from_mnemonic(mnemonic) {
            Some(opcode) => opcode,
            // Unknown mnemonics are reported in pass two
            None => return 0,
        };
        if !opcode.takes_mode_byte() {
            return 1;
        }
        let mut size: u32 = 2; // opcode + mode byte
        for (index, operand) in line.operands.iter().enumerate() {
            if index >= 3 {
                size += 1; // trailing operands are single imm8 bytes
                continue;
            }
            match self.classify_operand(operand, line.number) {
                Ok(operand_type) => size += operand_type.encoded_size() as u32,
                Err(_) => size += 1, // the error resurfaces in pass two
            }
        }
        size
    }

    // ---- pass two ---------------------------------------------------------------

    /// Emits the binary image and segment records.
    fn second_pass(&mut self, lines: &[Line]) -> Assembly {
        let mut binary: Vec<u8> = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        let mut segment_start: u16 = 0;
        let mut segment_offset: usize = 0;
        for line in lines {
            match line.directive.as_deref() {
                Some("ORG") => {
                    if let Some(arg) = line.directive_args.first() {
                        if let Some(address) = parse_org_address(arg) {
                            if binary.len() > segment_offset {
                                segments.push(Segment {
                                    start: segment_start,
                                    length: binary.len() - segment_offset,
                                    offset: segment_offset,
                                });
                            }
                            segment_start = address;
                            segment_offset = binary.len();
                        }
                    }
                    continue;
                }
                Some("EQU") => continue,
                Some("DB") => {
                    let bytes = self.generate_db(line);
                    binary.extend(bytes);
                    continue;
                }
                Some("DW") => {
                    let bytes = self.generate_dw(line);
                    binary.extend(bytes);
                    continue;
                }
                Some("DEFSTR") => {
                    let bytes = self.generate_defstr(line);
                    binary.extend(bytes);
                    continue;
                }
                _ => {}
            }
            if line.instruction.is_some() {
                let bytes = self.generate_instruction(line);
                binary.extend(bytes);
            }
        }
        if binary.len() > segment_offset {
            segments.push(Segment {
                start: segment_start,
                length: binary.len() - segment_offset,
                offset: segment_offset,
            });
        }
        Assembly { binary, segments }
    }

    fn generate_db(&mut self, line: &Line) -> Vec<u8> {
        let mut bytes = Vec::new();
        for arg in &line.directive_args {
            if is_string_literal(arg) {
                bytes.extend(parse_string_literal(arg));
            } else {
                match self.resolve_value(arg) {
                    Some(value) if value <= 255 => bytes.push(value as u8),
                    Some(value) => {
                        self.error(line.number, format!("value {} too large for DB (max 255)", value))
                    }
                    None => self.error(line.number, format!("unknown value in DB: {}", arg)),
                }
            }
        }
        bytes
    }

    fn generate_dw(&mut self, line: &Line) -> Vec<u8> {
        let mut bytes = Vec::new();
        for arg in &line.directive_args {
            match self.resolve_value(arg) {
                Some(value) if value <= 65535 => {
                    bytes.push((value >> 8) as u8);
                    bytes.push(value as u8);
                }
                Some(value) => self.error(
                    line.number,
                    format!("value {} too large for DW (max 65535)", value),
                ),
                None => self.error(line.number, format!("unknown value in DW: {}", arg)),
            }
        }
        bytes
    }

    fn generate_defstr(&mut self, line: &Line) -> Vec<u8> {
        let arg = match line.directive_args.as_slice() {
            [only] if is_string_literal(only) => only,
            _ => {
                self.error(line.number, "DEFSTR requires exactly one string argument");
                return Vec::new();
            }
        };
        let content = parse_string_literal(arg);
        if content.len() > 254 {
            self.error(
                line.number,
                format!(
                    "string too long for DEFSTR (max 254 bytes + null terminator), got {}",
                    content.len()
                ),
            );
            return Vec::new();
        }
        let mut bytes = content;
        bytes.push(0);
        bytes
    }

    /// Emits one instruction: opcode byte, mode byte (unless the opcode belongs to
    /// the fixed no-operand set), then the operand data.
    fn generate_instruction(&mut self, line: &Line) -> Vec<u8> {
        let mnemonic = line.instruction.as_deref().unwrap_or_default();
        let opcode = match Opcode::from_mnemonic(mnemonic) {
            Some(opcode) => opcode,
            None => {
                self.error(line.number, format!("unknown instruction: {}", mnemonic));
                return Vec::new();
            }
        };
        if line.operands.len() != opcode.operand_count() {
            self.error(
                line.number,
                format!(
                    "{} expects {} operand(s), got {}",
                    mnemonic,
                    opcode.operand_count(),
                    line.operands.len()
                ),
            );
            return Vec::new();
        }
        let mut bytes = vec![opcode.byte()];
        if !opcode.takes_mode_byte() {
            return bytes;
        }
        let mut types: Vec<OperandType> = Vec::new();
        for operand in line.operands.iter().take(3) {
            match self.classify_operand(operand, line.number) {
                Ok(operand_type) => types.push(operand_type),
                Err(error) => {
                    self.errors.push(error);
                    return Vec::new();
                }
            }
        }
        bytes.push(mode_byte(&types));
        for (index, operand) in line.operands.iter().enumerate() {
            let encoded = if index >= 3 {
                self.encode_trailing_operand(operand, line.number)
            } else {
                self.encode_operand(operand, types[index], line.number)
            };
            match encoded {
                Some(encoded) => bytes.extend(encoded),
                None => return Vec::new(),
            }
        }
        bytes
    }

    /// Encodes operands four and up, which are always single 8-bit immediates.
    fn encode_trailing_operand(&mut self, operand: &str, line: usize) -> Option<Vec<u8>> {
        match self.resolve_value(operand) {
            Some(value) if value <= 255 => Some(vec![value as u8]),
            Some(value) => {
                self.error(line, format!("operand value {} exceeds one byte", value));
                None
            }
            None => {
                self.error(line, format!("unknown symbol: {}", operand));
                None
            }
        }
    }

    fn encode_operand(
        &mut self,
        operand: &str,
        operand_type: OperandType,
        line: usize,
    ) -> Option<Vec<u8>> {
        match operand_type {
            OperandType::Register => match Register::from_name(operand) {
                Some(register) => Some(vec![register.code()]),
                None => {
                    self.error(line, format!("unknown register: {}", operand));
                    None
                }
            },
            OperandType::Immediate8 => {
                let value = self.resolve_immediate(operand, line)?;
                Some(vec![value as u8])
            }
            OperandType::Immediate16 => {
                let value = self.resolve_immediate(operand, line)?;
                Some(vec![(value >> 8) as u8, value as u8])
            }
            OperandType::RegisterIndirect => {
                let inner = operand.trim_start_matches('[').trim_end_matches(']').trim();
                match base_register_code(inner) {
                    Some(code) => Some(vec![code]),
                    None => {
                        self.error(line, format!("invalid indirect register: {}", inner));
                        None
                    }
                }
            }
            OperandType::RegisterIndexed => self.encode_indexed_operand(operand, line),
            OperandType::Direct => {
                let inner = operand.trim_start_matches('[').trim_end_matches(']').trim();
                match parse_number(inner) {
                    Some(address) if address <= 0xFFFF => {
                        Some(vec![(address >> 8) as u8, address as u8])
                    }
                    _ => {
                        self.error(line, format!("invalid direct address: {}", operand));
                        None
                    }
                }
            }
        }
    }

    /// Encodes `[reg+offset]` / `[reg-offset]` as the base register code followed by
    /// a two's-complement index byte.  A register-named offset encodes the register
    /// ordinal (R5 -> 5, P5 -> 15).
    fn encode_indexed_operand(&mut self, operand: &str, line: usize) -> Option<Vec<u8>> {
        let inner = operand.trim_start_matches('[').trim_end_matches(']').trim();
        let (base, signed_offset) = split_index_expression(inner)?;
        let code = base_register_code(base)?;
        let (sign, offset_text) = signed_offset;
        let magnitude: i32 = if let Some(ordinal) = register_ordinal(offset_text) {
            ordinal as i32
        } else if let Some(value) = parse_number(offset_text) {
            value as i32
        } else {
            self.error(line, format!("invalid index offset: {}", offset_text));
            return None;
        };
        let offset = if sign == '-' { -magnitude } else { magnitude };
        if !(-128..=127).contains(&offset) {
            self.error(
                line,
                format!("index offset {} outside the signed byte range", offset),
            );
            return None;
        }
        Some(vec![code, (offset as i8) as u8])
    }

    fn resolve_immediate(&mut self, operand: &str, line: usize) -> Option<u32> {
        // High byte of a 16-bit symbol: SYMBOL:
        if let Some(name) = operand.strip_suffix(':') {
            if is_identifier(name) {
                return match self.symbol_value(name) {
                    Some(value) => Some((value >> 8) & 0xFF),
                    None => {
                        self.error(line, format!("unknown symbol for high byte: {}", name));
                        None
                    }
                };
            }
        }
        // Low byte of a 16-bit symbol: :SYMBOL
        if let Some(name) = operand.strip_prefix(':') {
            if is_identifier(name) {
                return match self.symbol_value(name) {
                    Some(value) => Some(value & 0xFF),
                    None => {
                        self.error(line, format!("unknown symbol for low byte: {}", name));
                        None
                    }
                };
            }
        }
        match self.resolve_value(operand) {
            Some(value) => Some(value),
            None => {
                self.error(line, format!("unknown symbol: {}", operand));
                None
            }
        }
    }
}

/// Builds the mode byte from the classified types of the first three operands:
/// two class bits per operand (LSB first), bit 6 for indexed, bit 7 for direct.
fn mode_byte(types: &[OperandType]) -> u8 {
    let mut mode: u8 = 0;
    for (index, operand_type) in types.iter().enumerate() {
        mode |= operand_type.mode_class() << (index * 2);
    }
    if types.contains(&OperandType::RegisterIndexed) {
        mode |= 1 << 6;
    }
    if types.contains(&OperandType::Direct) {
        mode |= 1 << 7;
    }
    mode
}

/// Removes a trailing comment, honouring `;` characters inside string literals.
fn strip_comment(text: &str) -> &str {
    let mut in_string = false;
    for (index, character) in text.char_indices() {
        match character {
            '"' => in_string = !in_string,
            ';' if !in_string => return &text[..index],
            _ => {}
        }
    }
    text
}

/// Splits an operand list on commas, keeping quoted strings intact.
fn split_operands(text: &str) -> Vec<String> {
    let mut operands = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for character in text.chars() {
        match character {
            '"' => {
                in_string = !in_string;
                current.push(character);
            }
            ',' if !in_string => {
                if !current.trim().is_empty() {
                    operands.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(character),
        }
    }
    if !current.trim().is_empty() {
        operands.push(current.trim().to_string());
    }
    operands
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_-]*`.
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_string_literal(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

/// Parses a numeric literal: `0x` hex or plain decimal.
fn parse_number(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
        return text.parse().ok();
    }
    None
}

/// ORG addresses are hexadecimal, with or without the `0x` prefix.
fn parse_org_address(text: &str) -> Option<u16> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(hex, 16).ok()
}

/// Splits `base+offset` / `base-offset` inside an indexed operand, returning the
/// base text and the (sign, offset text) pair.
fn split_index_expression(inner: &str) -> Option<(&str, (char, &str))> {
    // Search from position 1 so a leading sign never splits
    for (index, character) in inner.char_indices().skip(1) {
        if character == '+' || character == '-' {
            let base = inner[..index].trim();
            let offset = inner[index + 1..].trim();
            if !base.is_empty() && !offset.is_empty() {
                return Some((base, (character, offset)));
            }
        }
    }
    None
}

/// Returns the register code for an indirect/indexed base register; only R and P
/// registers (including the SP/FP aliases) may hold addresses.
fn base_register_code(name: &str) -> Option<u8> {
    match Register::from_name(name)? {
        register @ (Register::R(_) | Register::P(_)) => Some(register.code()),
        _ => None,
    }
}

/// Returns the ordinal a register-named index offset encodes (R5 -> 5, P5 -> 15).
fn register_ordinal(name: &str) -> Option<u8> {
    match Register::from_name(name)? {
        Register::R(n) => Some(n as u8),
        Register::P(n) => Some(n as u8 + 10),
        _ => None,
    }
}

/// Decodes a string literal with the escapes `\n \t \r \\ \" \0`; any other
/// escape is taken literally.
fn parse_string_literal(literal: &str) -> Vec<u8> {
    let content = &literal[1..literal.len() - 1];
    let mut bytes = Vec::new();
    let mut chars = content.chars();
    while let Some(character) = chars.next() {
        if character == '\\' {
            match chars.next() {
                Some('n') => bytes.push(b'\n'),
                Some('t') => bytes.push(b'\t'),
                Some('r') => bytes.push(b'\r'),
                Some('\\') => bytes.push(b'\\'),
                Some('"') => bytes.push(b'"'),
                Some('0') => bytes.push(0),
                Some(other) => bytes.extend(other.to_string().as_bytes()),
                None => {}
            }
        } else {
            bytes.extend(character.to_string().as_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(source: &str) -> Assembly {
        Assembler::new().assemble(source).unwrap()
    }

    fn assemble_errors(source: &str) -> Vec<AssemblyError> {
        Assembler::new().assemble(source).unwrap_err()
    }

    #[test]
    fn test_mov_register_immediate8() {
        let assembly = assemble("MOV R0, 5\n");
        assert_eq!(assembly.binary, vec![0x06, 0x04, 0xA9, 0x05]);
    }

    #[test]
    fn test_mov_register_immediate16() {
        let assembly = assemble("MOV P0, 0x1234\n");
        assert_eq!(assembly.binary, vec![0x06, 0x08, 0xB3, 0x12, 0x34]);
    }

    #[test]
    fn test_immediate_width_split_at_128() {
        assert_eq!(assemble("PUSH 127\n").binary, vec![0x18, 0x01, 0x7F]);
        assert_eq!(assemble("PUSH 128\n").binary, vec![0x18, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn test_no_operand_instructions_have_no_mode_byte() {
        let assembly = assemble("HLT\nRET\nNOP\n");
        assert_eq!(assembly.binary, vec![0x00, 0x01, 0xFF]);
    }

    #[test]
    fn test_zero_operand_opcode_still_emits_mode_byte() {
        // SINV takes no operands but is not in the fixed no-operand set
        let assembly = assemble("SINV\n");
        assert_eq!(assembly.binary, vec![0x3B, 0x00]);
    }

    #[test]
    fn test_direct_memory_operands() {
        let assembly = assemble("MOV [0x2000], R0\n");
        assert_eq!(assembly.binary, vec![0x06, 0x83, 0x20, 0x00, 0xA9]);
        let assembly = assemble("MOV R2, [0x2000]\n");
        assert_eq!(assembly.binary, vec![0x06, 0x8C, 0xAB, 0x20, 0x00]);
    }

    #[test]
    fn test_register_indirect_operand() {
        let assembly = assemble("MOV R0, [P1]\n");
        assert_eq!(assembly.binary, vec![0x06, 0x0C, 0xA9, 0xB4]);
    }

    #[test]
    fn test_register_indexed_operand() {
        let assembly = assemble("MOV [P0+4], P1\n");
        assert_eq!(assembly.binary, vec![0x06, 0x43, 0xB3, 0x04, 0xB4]);
    }

    #[test]
    fn test_frame_pointer_offsets_are_twos_complement() {
        let assembly = assemble("MOV R0, [FP-2]\n");
        assert_eq!(assembly.binary, vec![0x06, 0x4C, 0xA9, 0xBC, 0xFE]);
        let assembly = assemble("MOV R0, [SP+3]\n");
        assert_eq!(assembly.binary, vec![0x06, 0x4C, 0xA9, 0xBB, 0x03]);
    }

    #[test]
    fn test_sp_and_fp_assemble_as_p8_p9() {
        let assembly = assemble("MOV SP, 0x0200\nMOV FP, SP\n");
        assert_eq!(
            assembly.binary,
            vec![0x06, 0x08, 0xBB, 0x02, 0x00, 0x06, 0x00, 0xBC, 0xBB]
        );
    }

    #[test]
    fn test_labels_and_forward_references() {
        let source = "ORG 0x1000\nMOV R0, 0\nLOOP: INC R0\nCMP R0, 5\nJNZ LOOP\nHLT\n";
        let assembly = assemble(source);
        assert_eq!(
            assembly.binary,
            vec![
                0x06, 0x04, 0xA9, 0x00, // MOV R0, 0
                0x0B, 0x00, 0xA9, // INC R0
                0x2E, 0x04, 0xA9, 0x05, // CMP R0, 5
                0x20, 0x08, 0x10, 0x04, // JNZ 0x1004
                0x00, // HLT
            ]
        );
        assert_eq!(assembly.segments, vec![Segment { start: 0x1000, length: 16, offset: 0 }]);
    }

    #[test]
    fn test_forward_jump_label() {
        let source = "JMP END\nNOP\nEND: HLT\n";
        let assembly = assemble(source);
        // JMP (4 bytes) + NOP (1) puts END at 0x0005
        assert_eq!(assembly.binary, vec![0x1E, 0x08, 0x00, 0x05, 0xFF, 0x00]);
    }

    #[test]
    fn test_equ_constants() {
        let source = "COUNT EQU 0x30\nMOV R0, COUNT\n";
        let assembly = assemble(source);
        // Symbols always assemble as 16-bit immediates
        assert_eq!(assembly.binary, vec![0x06, 0x08, 0xA9, 0x00, 0x30]);
    }

    #[test]
    fn test_high_and_low_byte_symbol_references() {
        let source = "ORG 0x1234\nSTART: MOV R0, START:\nMOV R1, :START\n";
        let assembly = assemble(source);
        assert_eq!(
            assembly.binary,
            vec![0x06, 0x04, 0xA9, 0x12, 0x06, 0x04, 0xAA, 0x34]
        );
    }

    #[test]
    fn test_db_directive_with_strings_and_values() {
        let assembly = assemble("DB 0x41, 66, \"C\"\n");
        assert_eq!(assembly.binary, vec![0x41, 0x42, 0x43]);
    }

    #[test]
    fn test_dw_directive_is_big_endian() {
        let assembly = assemble("DW 0x1234, 5\n");
        assert_eq!(assembly.binary, vec![0x12, 0x34, 0x00, 0x05]);
    }

    #[test]
    fn test_defstr_directive_appends_terminator() {
        let assembly = assemble("DEFSTR \"AB\\n\"\n");
        assert_eq!(assembly.binary, vec![0x41, 0x42, 0x0A, 0x00]);
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let assembly = assemble("; leading comment\n\nNOP ; trailing\n");
        assert_eq!(assembly.binary, vec![0xFF]);
    }

    #[test]
    fn test_semicolon_inside_string_is_not_a_comment() {
        let assembly = assemble("DB \"a;b\"\n");
        assert_eq!(assembly.binary, vec![0x61, 0x3B, 0x62]);
    }

    #[test]
    fn test_multi_segment_org_records() {
        let source = "ORG 0x1000\nNOP\nORG 0x4000\nDB 1, 2\n";
        let assembly = assemble(source);
        assert_eq!(
            assembly.segments,
            vec![
                Segment { start: 0x1000, length: 1, offset: 0 },
                Segment { start: 0x4000, length: 2, offset: 1 },
            ]
        );
        assert!(assembly.needs_org_file());
        let records = assembly.org_records();
        assert!(records.contains("0x1000 1 0"));
        assert!(records.contains("0x4000 2 1"));
    }

    #[test]
    fn test_single_segment_at_zero_needs_no_org_file() {
        let assembly = assemble("NOP\n");
        assert!(!assembly.needs_org_file());
    }

    #[test]
    fn test_trailing_operands_encode_as_bytes() {
        // SRECT x1,y1,x2,y2,color,filled: operands 4-6 are single bytes
        let assembly = assemble("SRECT 1, 2, 3, 4, 0xFF, 1\n");
        assert_eq!(
            assembly.binary,
            vec![0x39, 0x15, 0x01, 0x02, 0x03, 0x04, 0xFF, 0x01]
        );
    }

    #[test]
    fn test_unknown_instruction_reports_line() {
        let errors = assemble_errors("NOP\nFROB R0\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].message.contains("unknown instruction"));
    }

    #[test]
    fn test_unknown_symbol_reports_line() {
        let errors = assemble_errors("JMP NOWHERE\n");
        assert_eq!(errors[0].line, 1);
        assert!(errors[0].message.contains("unknown symbol"));
    }

    #[test]
    fn test_direct_indexed_memory_is_rejected() {
        let errors = assemble_errors("MOV R0, [0x2000+R1]\n");
        assert!(errors[0].message.contains("not supported"));
    }

    #[test]
    fn test_oversized_db_value_is_rejected() {
        let errors = assemble_errors("DB 256\n");
        assert!(errors[0].message.contains("too large for DB"));
    }

    #[test]
    fn test_oversized_defstr_is_rejected() {
        let long = format!("DEFSTR \"{}\"\n", "x".repeat(255));
        let errors = assemble_errors(&long);
        assert!(errors[0].message.contains("too long for DEFSTR"));
    }

    #[test]
    fn test_errors_are_collected_across_lines() {
        let errors = assemble_errors("FROB R0\nDB 999\n");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 2);
    }

    #[test]
    fn test_operand_count_mismatch_is_rejected() {
        let errors = assemble_errors("MOV R0\n");
        assert!(errors[0].message.contains("expects 2 operand(s)"));
    }

    #[test]
    fn test_error_display_format() {
        let errors = assemble_errors("FROB R0\n");
        assert!(format!("{}", errors[0]).starts_with("Error on line 1:"));
    }
}
