// src/decoder/mod.rs

pub mod control;
pub mod dsp;
pub mod offline;
pub mod output;
pub mod probe;
pub mod resample;

use crate::error::EnhancerError;
use log::{debug, warn};
use ringbuf::traits::Producer as RbProducer;
use rubato::{Resampler, SincFixedIn}; // Resampler for .reset()
use std::fs::File;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::default::{get_codecs, get_probe};

pub use control::{DecoderCmd, DecoderFlags};
pub use offline::{decode_to_stereo, DecodedAudio};
pub use probe::{probe_file, TrackInfo};

const EOF_POLL: Duration = Duration::from_millis(20);

/// Streams one file into a ring buffer on its own thread, resampled to the
/// output rate and mixed to `output_channels`.
pub struct Decoder<P>
where
    P: RbProducer<Item = f32> + Send + 'static,
{
    path: String,
    producer: P,
    flags: DecoderFlags,
    output_channels: usize,
    source_sample_rate: u32,
    output_sample_rate: u32,
    cmd_rx: Receiver<DecoderCmd>,
    post_seek_fade_samples: usize,
}

impl<P> Decoder<P>
where
    P: RbProducer<Item = f32> + Send + 'static,
{
    pub fn new(
        path: String,
        producer: P,
        flags: DecoderFlags,
        output_channels: usize,
        source_sample_rate: u32,
        output_sample_rate: u32,
        cmd_rx: Receiver<DecoderCmd>,
    ) -> Self {
        Self {
            path,
            producer,
            flags,
            output_channels,
            source_sample_rate,
            output_sample_rate,
            cmd_rx,
            post_seek_fade_samples: 0,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let finished = self.flags.finished.clone();
        thread::spawn(move || {
            let path = self.path.clone();
            if let Err(e) = self.run() {
                warn!("decoder for {path} stopped: {e:#}");
            }
            finished.store(true, Ordering::Release);
        })
    }

    fn shutting_down(&self) -> bool {
        self.flags.shutdown.load(Ordering::Acquire)
    }

    fn push(&mut self, data: &[f32]) -> bool {
        output::push_with_fade(
            &mut self.producer,
            data,
            &mut self.post_seek_fade_samples,
            &self.flags.shutdown,
        )
    }

    fn run(mut self) -> anyhow::Result<()> {
        let file = File::open(&self.path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let probed = get_probe().format(
            &Default::default(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| EnhancerError::NoAudioTrack { path: self.path.clone() })?;
        let track_id = track.id;

        let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let actual_rate = track.codec_params.sample_rate.unwrap_or(self.source_sample_rate);

        let mut resampler =
            resample::build_resampler(actual_rate, self.output_sample_rate, self.output_channels)?;
        let mut stage_planar: Vec<Vec<f32>> = vec![Vec::with_capacity(4096); self.output_channels];

        debug!(
            "decoding {} at {} Hz -> {} Hz",
            self.path, actual_rate, self.output_sample_rate
        );

        // After the last packet the thread idles here until a seek or shutdown
        let mut at_eof = false;

        while !self.shutting_down() {
            let mut commands: Vec<DecoderCmd> = self.cmd_rx.try_iter().collect();
            if at_eof && commands.is_empty() {
                match self.cmd_rx.recv_timeout(EOF_POLL) {
                    Ok(cmd) => commands.push(cmd),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            for cmd in commands {
                match cmd {
                    DecoderCmd::Seek(target) => {
                        let time = symphonia::core::units::Time::new(
                            target.as_secs(),
                            target.subsec_nanos() as f64 / 1_000_000_000f64,
                        );
                        if let Err(e) = format.seek(
                            SeekMode::Accurate,
                            SeekTo::Time { time, track_id: Some(track_id) },
                        ) {
                            warn!("seek to {target:?} failed: {e}");
                            continue;
                        }
                        decoder.reset();
                        sample_buf = None;
                        for ch in &mut stage_planar {
                            ch.clear();
                        }
                        if let Some(r) = &mut resampler {
                            r.reset();
                        }
                        self.post_seek_fade_samples =
                            dsp::fade_samples_ms(self.output_sample_rate, 10) * self.output_channels;
                        if at_eof {
                            debug!("{}: resuming at {target:?}", self.path);
                            at_eof = false;
                        }
                        self.flags.finished.store(false, Ordering::Release);
                    }
                }
            }

            if at_eof {
                // Every seek failed; keep waiting
                self.flags.finished.store(true, Ordering::Release);
                continue;
            }

            let packet = match format.next_packet() {
                Ok(p) => Some(p),
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
                Err(SymphoniaError::ResetRequired) => None,
                Err(e) => {
                    warn!("{}: packet read failed: {e}", self.path);
                    None
                }
            };

            let Some(packet) = packet else {
                if !self.flush_resampler(&mut resampler, &mut stage_planar)? {
                    return Ok(());
                }
                at_eof = true;
                self.flags.finished.store(true, Ordering::Release);
                continue;
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => {
                    warn!("{}: decode failed: {e}", self.path);
                    if !self.flush_resampler(&mut resampler, &mut stage_planar)? {
                        return Ok(());
                    }
                    at_eof = true;
                    self.flags.finished.store(true, Ordering::Release);
                    continue;
                }
            };

            let decoded_ch = decoded.spec().channels.count();
            if sample_buf.as_ref().is_none_or(|b| b.capacity() < decoded.capacity()) {
                sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec()));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            let mixed = dsp::updown_mix_interleaved(buf.samples(), decoded_ch, self.output_channels);

            match resampler.as_mut() {
                Some(r) => {
                    dsp::append_interleaved_to_planar(&mixed, &mut stage_planar);
                    while let Some(block) = resample::try_process_exact(r, &mut stage_planar) {
                        let out = dsp::interleave(&block);
                        if !self.push(&out) {
                            return Ok(());
                        }
                    }
                }
                None => {
                    if !self.push(&mixed) {
                        return Ok(());
                    }
                }
            }

            if !self.flags.is_playing.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(10));
            }
        }

        Ok(())
    }

    /// Push what the resampler is still holding. Returns false on shutdown.
    fn flush_resampler(
        &mut self,
        resampler: &mut Option<SincFixedIn<f32>>,
        stage_planar: &mut [Vec<f32>],
    ) -> anyhow::Result<bool> {
        let Some(r) = resampler.as_mut() else {
            return Ok(true);
        };
        if let Some(planar) = resample::drain_remaining_planar(stage_planar) {
            let out = resample::process_partial(r, Some(planar.as_slice()))?;
            if !self.push(&dsp::interleave(&out)) {
                return Ok(false);
            }
        }
        let tail = resample::process_partial(r, None)?;
        if tail.first().is_some_and(|ch| !ch.is_empty()) && !self.push(&dsp::interleave(&tail)) {
            return Ok(false);
        }
        Ok(true)
    }
}

/// Spawn a decoder thread for `path`. Returns the thread handle and the
/// command sender used for seeking.
pub fn spawn_decoder(
    path: String,
    producer: impl RbProducer<Item = f32> + Send + 'static,
    flags: DecoderFlags,
    output_channels: usize,
    source_sample_rate: u32,
    output_sample_rate: u32,
) -> (JoinHandle<()>, Sender<DecoderCmd>) {
    let (tx, rx) = channel();
    let handle = Decoder::new(
        path,
        producer,
        flags,
        output_channels,
        source_sample_rate,
        output_sample_rate,
        rx,
    )
    .spawn();
    (handle, tx)
}
