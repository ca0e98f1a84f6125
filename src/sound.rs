/// The number of sound channels the register interface can address.
pub const SOUND_CHANNEL_COUNT: u8 = 8;

/// SW control bit: playback enable.
const SW_ENABLE: u8 = 0x80;
/// SW control bit: loop playback.
const SW_LOOP: u8 = 0x40;

/// The collaborator interface to an audio backend.
///
/// The emulator core drives this from the SPLAY/SSTOP/STRIG opcodes; a headless
/// build wires in [NullAudio].  Implementations receive raw register values and own
/// all synthesis concerns.
pub trait AudioSink {
    /// Begins playback on a channel.
    ///
    /// # Arguments
    ///
    /// * `channel` - the target channel (0..8)
    /// * `waveform` - the waveform selector from SW bits 0-2
    /// * `freq` - the SF frequency register value
    /// * `vol` - the SV volume register value
    /// * `looped` - whether playback should repeat until stopped
    fn play(&mut self, channel: u8, waveform: u8, freq: u8, vol: u8, looped: bool);

    /// Stops one channel, or every channel when `channel` is `None`.
    fn stop(&mut self, channel: Option<u8>);

    /// Triggers a canned sound effect.
    fn trig(&mut self, effect_id: u8);
}

/// A no-op [AudioSink] for headless builds.
#[derive(Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _channel: u8, _waveform: u8, _freq: u8, _vol: u8, _looped: bool) {}

    fn stop(&mut self, _channel: Option<u8>) {}

    fn trig(&mut self, _effect_id: u8) {}
}

/// The CPU-visible sound register shadow plus the attached audio collaborator.
///
/// SA is the 16-bit sample address; SF, SV and SW are the 8-bit frequency, volume
/// and waveform-control registers.  SW packs the playback parameters: bits 0-2
/// waveform, bits 3-5 channel, bit 6 loop, bit 7 enable.
pub struct Sound {
    /// SA - sample address register
    pub sa: u16,
    /// SF - frequency register
    pub sf: u8,
    /// SV - volume register
    pub sv: u8,
    /// SW - waveform/control register
    pub sw: u8,
    sink: Box<dyn AudioSink>,
}

impl Sound {
    /// Constructor that returns a [Sound] instance with zeroed registers and the
    /// supplied audio collaborator.
    pub(crate) fn new(sink: Box<dyn AudioSink>) -> Self {
        Sound {
            sa: 0,
            sf: 0,
            sv: 0,
            sw: 0,
            sink,
        }
    }

    /// Zeroes the registers and silences every channel.
    pub(crate) fn reset(&mut self) {
        self.sa = 0;
        self.sf = 0;
        self.sv = 0;
        self.sw = 0;
        self.sink.stop(None);
    }

    /// Executes SPLAY: when SW bit 7 (enable) is set, starts playback on the channel
    /// selected by SW bits 3-5 with the current register values.
    pub fn splay(&mut self) {
        if self.sw & SW_ENABLE == 0 {
            return;
        }
        let channel = (self.sw >> 3) & 0x07;
        let waveform = self.sw & 0x07;
        let looped = self.sw & SW_LOOP != 0;
        self.sink.play(channel, waveform, self.sf, self.sv, looped);
    }

    /// Executes SSTOP: silences every channel.
    pub fn sstop(&mut self) {
        self.sink.stop(None);
    }

    /// Executes STRIG: triggers a canned effect on the collaborator.
    pub fn strig(&mut self, effect_id: u8) {
        self.sink.trig(effect_id);
    }
}

/// A rodio-backed [AudioSink] with one sink per channel, usable when the `audio`
/// feature is enabled.  Waveform selection is reduced to a sine source; the effect
/// trigger plays a short beep.
#[cfg(feature = "audio")]
pub struct RodioAudio {
    _stream: rodio::OutputStream,
    sinks: Vec<rodio::Sink>,
}

#[cfg(feature = "audio")]
impl RodioAudio {
    /// Constructor that opens the default output device and prepares one paused sink
    /// per channel.  Returns `None` if no output device is available.
    pub fn new() -> Option<Self> {
        let (stream, handle) = rodio::OutputStream::try_default().ok()?;
        let mut sinks = Vec::new();
        for _ in 0..SOUND_CHANNEL_COUNT {
            let sink = rodio::Sink::try_new(&handle).ok()?;
            sink.pause();
            sinks.push(sink);
        }
        Some(RodioAudio {
            _stream: stream,
            sinks,
        })
    }

    /// Maps an 8-bit frequency register value onto 55Hz..1760Hz (A1..A6) with an
    /// exponential musical curve.
    fn register_to_frequency(value: u8) -> f32 {
        if value == 0 {
            return 0.0;
        }
        55.0 * 32.0_f32.powf(value as f32 / 255.0)
    }
}

#[cfg(feature = "audio")]
impl AudioSink for RodioAudio {
    fn play(&mut self, channel: u8, _waveform: u8, freq: u8, vol: u8, looped: bool) {
        use rodio::source::{SineWave, Source};
        use std::time::Duration;
        let sink = match self.sinks.get(channel as usize) {
            Some(sink) => sink,
            None => return,
        };
        let frequency = Self::register_to_frequency(freq);
        if frequency <= 0.0 {
            return;
        }
        sink.stop();
        sink.set_volume(vol as f32 / 255.0);
        let source = SineWave::new(frequency);
        if looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source.take_duration(Duration::from_millis(500)));
        }
        sink.play();
    }

    fn stop(&mut self, channel: Option<u8>) {
        match channel {
            Some(channel) => {
                if let Some(sink) = self.sinks.get(channel as usize) {
                    sink.stop();
                }
            }
            None => {
                for sink in &self.sinks {
                    sink.stop();
                }
            }
        }
    }

    fn trig(&mut self, _effect_id: u8) {
        use rodio::source::{SineWave, Source};
        use std::time::Duration;
        if let Some(sink) = self.sinks.first() {
            sink.stop();
            sink.set_volume(1.0);
            sink.append(SineWave::new(440.0).take_duration(Duration::from_millis(150)));
            sink.play();
        }
    }
}
