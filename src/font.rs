/// The pixel width and height of every glyph.
pub const GLYPH_SIZE: usize = 8;
/// The first ASCII code with a glyph (space).
const FIRST_GLYPH: u8 = 0x20;
/// The last ASCII code with a glyph.
const LAST_GLYPH: u8 = 0x7F;

/// The embedded 8x8 monospace font covering ASCII 0x20..=0x7F.  Each glyph is eight
/// row bytes, top row first; bit 7 is the leftmost pixel of each row.
const FONT_DATA: [u8; 768] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // space
    0x18, 0x18, 0x18, 0x18, 0x18, 0x00, 0x18, 0x00, // !
    0x6C, 0x6C, 0x48, 0x00, 0x00, 0x00, 0x00, 0x00, // "
    0x6C, 0x6C, 0xFE, 0x6C, 0xFE, 0x6C, 0x6C, 0x00, // #
    0x18, 0x3E, 0x60, 0x3C, 0x06, 0x7C, 0x18, 0x00, // $
    0x00, 0xC6, 0xCC, 0x18, 0x30, 0x66, 0xC6, 0x00, // %
    0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00, // &
    0x18, 0x18, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, // '
    0x0C, 0x18, 0x30, 0x30, 0x30, 0x18, 0x0C, 0x00, // (
    0x30, 0x18, 0x0C, 0x0C, 0x0C, 0x18, 0x30, 0x00, // )
    0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00, // *
    0x00, 0x18, 0x18, 0x7E, 0x18, 0x18, 0x00, 0x00, // +
    0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x30, // ,
    0x00, 0x00, 0x00, 0x7E, 0x00, 0x00, 0x00, 0x00, // -
    0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00, // .
    0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0x80, 0x00, // /
    0x7C, 0xC6, 0xCE, 0xD6, 0xE6, 0xC6, 0x7C, 0x00, // 0
    0x18, 0x38, 0x18, 0x18, 0x18, 0x18, 0x7E, 0x00, // 1
    0x7C, 0xC6, 0x06, 0x1C, 0x30, 0x66, 0xFE, 0x00, // 2
    0x7C, 0xC6, 0x06, 0x3C, 0x06, 0xC6, 0x7C, 0x00, // 3
    0x1C, 0x3C, 0x6C, 0xCC, 0xFE, 0x0C, 0x1E, 0x00, // 4
    0xFE, 0xC0, 0xC0, 0xFC, 0x06, 0xC6, 0x7C, 0x00, // 5
    0x38, 0x60, 0xC0, 0xFC, 0xC6, 0xC6, 0x7C, 0x00, // 6
    0xFE, 0xC6, 0x0C, 0x18, 0x30, 0x30, 0x30, 0x00, // 7
    0x7C, 0xC6, 0xC6, 0x7C, 0xC6, 0xC6, 0x7C, 0x00, // 8
    0x7C, 0xC6, 0xC6, 0x7E, 0x06, 0x0C, 0x78, 0x00, // 9
    0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x00, // :
    0x00, 0x18, 0x18, 0x00, 0x00, 0x18, 0x18, 0x30, // ;
    0x06, 0x0C, 0x18, 0x30, 0x18, 0x0C, 0x06, 0x00, // <
    0x00, 0x00, 0x7E, 0x00, 0x00, 0x7E, 0x00, 0x00, // =
    0x60, 0x30, 0x18, 0x0C, 0x18, 0x30, 0x60, 0x00, // >
    0x7C, 0xC6, 0x0C, 0x18, 0x18, 0x00, 0x18, 0x00, // ?
    0x7C, 0xC6, 0xDE, 0xDE, 0xDE, 0xC0, 0x78, 0x00, // @
    0x38, 0x6C, 0xC6, 0xFE, 0xC6, 0xC6, 0xC6, 0x00, // A
    0xFC, 0x66, 0x66, 0x7C, 0x66, 0x66, 0xFC, 0x00, // B
    0x3C, 0x66, 0xC0, 0xC0, 0xC0, 0x66, 0x3C, 0x00, // C
    0xF8, 0x6C, 0x66, 0x66, 0x66, 0x6C, 0xF8, 0x00, // D
    0xFE, 0x62, 0x68, 0x78, 0x68, 0x62, 0xFE, 0x00, // E
    0xFE, 0x62, 0x68, 0x78, 0x68, 0x60, 0xF0, 0x00, // F
    0x3C, 0x66, 0xC0, 0xC0, 0xCE, 0x66, 0x3E, 0x00, // G
    0xC6, 0xC6, 0xC6, 0xFE, 0xC6, 0xC6, 0xC6, 0x00, // H
    0x3C, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, 0x00, // I
    0x1E, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78, 0x00, // J
    0xE6, 0x66, 0x6C, 0x78, 0x6C, 0x66, 0xE6, 0x00, // K
    0xF0, 0x60, 0x60, 0x60, 0x62, 0x66, 0xFE, 0x00, // L
    0xC6, 0xEE, 0xFE, 0xFE, 0xD6, 0xC6, 0xC6, 0x00, // M
    0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00, // N
    0x7C, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // O
    0xFC, 0x66, 0x66, 0x7C, 0x60, 0x60, 0xF0, 0x00, // P
    0x7C, 0xC6, 0xC6, 0xC6, 0xD6, 0xDE, 0x7C, 0x06, // Q
    0xFC, 0x66, 0x66, 0x7C, 0x6C, 0x66, 0xE6, 0x00, // R
    0x7C, 0xC6, 0x60, 0x38, 0x0C, 0xC6, 0x7C, 0x00, // S
    0x7E, 0x5A, 0x18, 0x18, 0x18, 0x18, 0x3C, 0x00, // T
    0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // U
    0xC6, 0xC6, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00, // V
    0xC6, 0xC6, 0xD6, 0xFE, 0xFE, 0xEE, 0xC6, 0x00, // W
    0xC6, 0x6C, 0x38, 0x38, 0x38, 0x6C, 0xC6, 0x00, // X
    0x66, 0x66, 0x66, 0x3C, 0x18, 0x18, 0x3C, 0x00, // Y
    0xFE, 0xC6, 0x8C, 0x18, 0x32, 0x66, 0xFE, 0x00, // Z
    0x3C, 0x30, 0x30, 0x30, 0x30, 0x30, 0x3C, 0x00, // [
    0xC0, 0x60, 0x30, 0x18, 0x0C, 0x06, 0x02, 0x00, // backslash
    0x3C, 0x0C, 0x0C, 0x0C, 0x0C, 0x0C, 0x3C, 0x00, // ]
    0x10, 0x38, 0x6C, 0xC6, 0x00, 0x00, 0x00, 0x00, // ^
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, // _
    0x30, 0x18, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, // `
    0x00, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x76, 0x00, // a
    0xE0, 0x60, 0x7C, 0x66, 0x66, 0x66, 0xDC, 0x00, // b
    0x00, 0x00, 0x7C, 0xC6, 0xC0, 0xC6, 0x7C, 0x00, // c
    0x1C, 0x0C, 0x7C, 0xCC, 0xCC, 0xCC, 0x76, 0x00, // d
    0x00, 0x00, 0x7C, 0xC6, 0xFE, 0xC0, 0x7C, 0x00, // e
    0x38, 0x6C, 0x60, 0xF0, 0x60, 0x60, 0xF0, 0x00, // f
    0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8, // g
    0xE0, 0x60, 0x6C, 0x76, 0x66, 0x66, 0xE6, 0x00, // h
    0x18, 0x00, 0x38, 0x18, 0x18, 0x18, 0x3C, 0x00, // i
    0x06, 0x00, 0x0E, 0x06, 0x06, 0x66, 0x66, 0x3C, // j
    0xE0, 0x60, 0x66, 0x6C, 0x78, 0x6C, 0xE6, 0x00, // k
    0x38, 0x18, 0x18, 0x18, 0x18, 0x18, 0x3C, 0x00, // l
    0x00, 0x00, 0xEC, 0xFE, 0xD6, 0xD6, 0xD6, 0x00, // m
    0x00, 0x00, 0xDC, 0x66, 0x66, 0x66, 0x66, 0x00, // n
    0x00, 0x00, 0x7C, 0xC6, 0xC6, 0xC6, 0x7C, 0x00, // o
    0x00, 0x00, 0xDC, 0x66, 0x66, 0x7C, 0x60, 0xF0, // p
    0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0x1E, // q
    0x00, 0x00, 0xDC, 0x76, 0x60, 0x60, 0xF0, 0x00, // r
    0x00, 0x00, 0x7E, 0xC0, 0x7C, 0x06, 0xFC, 0x00, // s
    0x30, 0x30, 0xFC, 0x30, 0x30, 0x36, 0x1C, 0x00, // t
    0x00, 0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0x76, 0x00, // u
    0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00, // v
    0x00, 0x00, 0xC6, 0xD6, 0xD6, 0xFE, 0x6C, 0x00, // w
    0x00, 0x00, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0x00, // x
    0x00, 0x00, 0xC6, 0xC6, 0xC6, 0x7E, 0x06, 0xFC, // y
    0x00, 0x00, 0x7E, 0x4C, 0x18, 0x32, 0x7E, 0x00, // z
    0x0E, 0x18, 0x18, 0x70, 0x18, 0x18, 0x0E, 0x00, // {
    0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00, // |
    0x70, 0x18, 0x18, 0x0E, 0x18, 0x18, 0x70, 0x00, // }
    0x76, 0xDC, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // ~
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // DEL
];

/// Returns the eight row bytes of the glyph for the specified ASCII code.  Codes
/// outside 0x20..=0x7F render as a space.
///
/// # Arguments
///
/// * `code` - the ASCII code of the character to look up
pub(crate) fn glyph(code: u8) -> &'static [u8] {
    let code = if (FIRST_GLYPH..=LAST_GLYPH).contains(&code) {
        code
    } else {
        FIRST_GLYPH
    };
    let index = (code - FIRST_GLYPH) as usize * GLYPH_SIZE;
    &FONT_DATA[index..index + GLYPH_SIZE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_glyph_is_blank() {
        assert_eq!(glyph(b' '), &[0u8; 8]);
    }

    #[test]
    fn test_out_of_range_codes_render_as_space() {
        assert_eq!(glyph(0x00), glyph(b' '));
        assert_eq!(glyph(0x1F), glyph(b' '));
        assert_eq!(glyph(0x80), glyph(b' '));
        assert_eq!(glyph(0xFF), glyph(b' '));
    }

    #[test]
    fn test_glyphs_are_distinct() {
        assert_ne!(glyph(b'A'), glyph(b'B'));
        assert_ne!(glyph(b'0'), glyph(b'O'));
    }

    #[test]
    fn test_exclamation_leftmost_bit_layout() {
        // '!' is a centred column: bit 7 must not be set on any row
        for row in glyph(b'!') {
            assert_eq!(row & 0x80, 0);
        }
    }
}
