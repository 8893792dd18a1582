/// Sound engine: procedural 8-bit style effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer once at
/// startup; playback is fire-and-forget through a detached Sink.
/// Building without the "sound" feature swaps in a no-op stub.

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_shoot: Arc<Vec<u8>>,
        sfx_hit: Arc<Vec<u8>>,
        sfx_pop: Arc<Vec<u8>>,
        sfx_kill: Arc<Vec<u8>>,
        sfx_die: Arc<Vec<u8>>,
        sfx_wave: Arc<Vec<u8>>,
        sfx_start: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_shoot: Arc::new(make_wav(&gen_shoot())),
                sfx_hit: Arc::new(make_wav(&gen_hit())),
                sfx_pop: Arc::new(make_wav(&gen_pop())),
                sfx_kill: Arc::new(make_wav(&gen_kill())),
                sfx_die: Arc::new(make_wav(&gen_die())),
                sfx_wave: Arc::new(make_wav(&gen_wave_clear())),
                sfx_start: Arc::new(make_wav(&gen_start())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        pub fn play_shoot(&self) { self.play(&self.sfx_shoot); }
        pub fn play_hit(&self) { self.play(&self.sfx_hit); }
        pub fn play_pop(&self) { self.play(&self.sfx_pop); }
        pub fn play_kill(&self) { self.play(&self.sfx_kill); }
        pub fn play_die(&self) { self.play(&self.sfx_die); }
        pub fn play_wave_clear(&self) { self.play(&self.sfx_wave); }
        pub fn play_start(&self) { self.play(&self.sfx_start); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — Vec<f32> mono samples in [-1, 1]
    // ════════════════════════════════════════════════════════════

    /// Shot: fast descending zap, 900Hz → 300Hz.
    fn gen_shoot() -> Vec<f32> {
        let duration = 0.07;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 900.0 - t * 600.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (ti * freq * TAU).sin() * env * 0.2
            })
            .collect()
    }

    /// Mushroom chip: dull thud, tone plus a short noise burst.
    fn gen_hit() -> Vec<f32> {
        let duration = 0.06;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut lcg: u32 = 77777;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * 220.0 * TAU).sin();
                lcg = lcg.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (lcg as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.2);
                (tone * 0.5 + noise * 0.5) * env * 0.25
            })
            .collect()
    }

    /// Mushroom destroyed: hollow pop, two quick sine taps.
    fn gen_pop() -> Vec<f32> {
        let notes = [330.0_f32, 165.0];
        let note_dur = 0.05;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                samples.push((t * freq * TAU).sin() * env * 0.3);
            }
        }
        samples
    }

    /// Segment kill: bright ascending arpeggio, square-ish for retro bite.
    fn gen_kill() -> Vec<f32> {
        let notes = [659.0_f32, 880.0, 1319.0]; // E5, A5, E6
        let note_dur = 0.04;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Ship destroyed: sad falling tones with a tail fade.
    fn gen_die() -> Vec<f32> {
        let notes = [494.0_f32, 415.0, 349.0, 294.0]; // B4→Ab4→F4→D4
        let note_dur = 0.11;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                samples.push((t * freq * TAU).sin() * env * 0.3);
            }
        }
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for i in (total - fade_len)..total {
            let ratio = (total - i) as f32 / fade_len as f32;
            samples[i] *= ratio;
        }
        samples
    }

    /// Wave cleared: short ascending fanfare with a sustained top note.
    fn gen_wave_clear() -> Vec<f32> {
        let notes = [523.0_f32, 659.0, 784.0]; // C5, E5, G5
        let note_dur = 0.09;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let last = 1047.0_f32; // C6
        let n = (SAMPLE_RATE as f32 * 0.2) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - i as f32 / n as f32;
            samples.push((t * last * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Game start: two-note chime.
    fn gen_start() -> Vec<f32> {
        let pairs = [(523.0_f32, 0.08), (784.0, 0.16)]; // C5, G5
        let mut samples = Vec::new();
        for &(freq, dur) in &pairs {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ── Public API — no-ops when the sound feature is off ──

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
    pub fn play_shoot(&self) {}
    pub fn play_hit(&self) {}
    pub fn play_pop(&self) {}
    pub fn play_kill(&self) {}
    pub fn play_die(&self) {}
    pub fn play_wave_clear(&self) {}
    pub fn play_start(&self) {}
}
