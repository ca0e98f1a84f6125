mod assembler;
mod disassembler;
mod error;
mod font;
mod gfx;
mod keyboard;
mod machine;
mod memory;
mod opcode;
mod options;
mod palette;
mod registers;
mod sound;
mod timer;

// Re-exports
pub use crate::assembler::{Assembler, Assembly, AssemblyError, Segment};
pub use crate::disassembler::{disassemble, DisassembledLine};
pub use crate::error::*;
pub use crate::gfx::{Graphics, Layer, SpriteBlock, LAYER_COUNT, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use crate::keyboard::Keyboard;
pub use crate::machine::{Machine, VECTOR_KEYBOARD, VECTOR_SERIAL, VECTOR_TIMER};
pub use crate::memory::{Memory, MEMORY_SIZE};
pub use crate::opcode::Opcode;
pub use crate::options::Options;
pub use crate::palette::generate_palette;
pub use crate::registers::*;
#[cfg(feature = "audio")]
pub use crate::sound::RodioAudio;
pub use crate::sound::{AudioSink, NullAudio, Sound, SOUND_CHANNEL_COUNT};
pub use crate::timer::Timer;
