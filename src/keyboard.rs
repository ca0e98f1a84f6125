use std::collections::VecDeque;

/// The maximum number of pending keys held in the controller buffer.
const KEY_BUFFER_SIZE: usize = 16;

/// Status register bit: at least one key is available.
pub const STATUS_KEY_AVAILABLE: u8 = 0x01;
/// Status register bit: the buffer is full.
pub const STATUS_BUFFER_FULL: u8 = 0x02;
/// Status register bit: an interrupt is pending.
pub const STATUS_IRQ_PENDING: u8 = 0x80;

/// An abstraction of the Nova-16 keyboard controller.
///
/// Four registers (data, status, control, count) and an ordered buffer of up to 16
/// pending key codes.  The data register always mirrors the key at the head of the
/// buffer.  The interrupt-pending status bit is set by [Keyboard::press_key] when
/// requested and cleared by the CPU's interrupt poll.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyboard {
    /// Data register: the key code at the head of the buffer
    pub data: u8,
    /// Status register (see the STATUS_* bits)
    pub status: u8,
    /// Control register (program-defined)
    pub control: u8,
    buffer: VecDeque<u8>,
}

impl Keyboard {
    /// Constructor that returns a [Keyboard] with an empty buffer and cleared registers.
    pub(crate) fn new() -> Self {
        Keyboard {
            data: 0,
            status: 0,
            control: 0,
            buffer: VecDeque::with_capacity(KEY_BUFFER_SIZE),
        }
    }

    /// Restores the post-reset state.
    pub(crate) fn reset(&mut self) {
        *self = Keyboard::new();
    }

    /// Returns the number of keys waiting in the buffer (the count register).
    pub fn count(&self) -> u8 {
        self.buffer.len() as u8
    }

    /// Appends a key code to the buffer, updating the data and status registers.
    /// When the buffer is already full the key is dropped (the full bit stays set).
    ///
    /// # Arguments
    ///
    /// * `code` - the key code to enqueue
    /// * `raise_irq` - set the interrupt-pending status bit (keyboard vector enabled)
    pub fn press_key(&mut self, code: u8, raise_irq: bool) {
        if self.buffer.len() < KEY_BUFFER_SIZE {
            self.buffer.push_back(code);
            self.data = code;
            self.status |= STATUS_KEY_AVAILABLE;
            if self.buffer.len() >= KEY_BUFFER_SIZE {
                self.status |= STATUS_BUFFER_FULL;
            }
            if raise_irq {
                self.status |= STATUS_IRQ_PENDING;
            }
        }
    }

    /// Removes and returns the oldest key from the buffer (0 when empty), updating
    /// the data register to the next pending key and maintaining the status bits.
    pub fn read_key(&mut self) -> u8 {
        match self.buffer.pop_front() {
            Some(code) => {
                match self.buffer.front() {
                    Some(next) => self.data = *next,
                    None => {
                        self.data = 0;
                        self.status &= !STATUS_KEY_AVAILABLE;
                    }
                }
                if self.buffer.len() < KEY_BUFFER_SIZE {
                    self.status &= !STATUS_BUFFER_FULL;
                }
                code
            }
            None => {
                self.data = 0;
                self.status &= !(STATUS_KEY_AVAILABLE | STATUS_BUFFER_FULL);
                0
            }
        }
    }

    /// Empties the buffer and clears the data and status registers.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.data = 0;
        self.status = 0;
    }

    /// Returns true if an interrupt is pending, clearing the pending bit (called by
    /// the CPU when it dispatches the keyboard vector).
    pub(crate) fn take_pending_irq(&mut self) -> bool {
        if self.status & STATUS_IRQ_PENDING != 0 {
            self.status &= !STATUS_IRQ_PENDING;
            true
        } else {
            false
        }
    }
}
