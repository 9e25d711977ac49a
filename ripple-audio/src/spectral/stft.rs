//! Streaming overlap-add buffers
//!
//! Two circular FIFOs of `FFT_SIZE` samples share one position. Each call to
//! `push` writes one input sample, drains (and zeroes) one output sample and
//! advances the hop counter; every `HOP_SIZE` samples it reports
//! `FrameState::FrameReady`. The caller then unwraps the input FIFO into a
//! linear frame, transforms it, and overlap-adds the result back.
//!
//! Input-to-output latency is exactly `FFT_SIZE` samples.

use super::fft::{FFT_SIZE, HOP_SIZE};

/// Hop state after a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Still filling the current hop
    Accumulating,
    /// A full hop has arrived; process one frame now
    FrameReady,
}

/// Circular input/output FIFOs for hop-based processing
pub struct OverlapAdd {
    input_fifo: [f32; FFT_SIZE],
    output_fifo: [f32; FFT_SIZE],
    /// Next write (and read) index, shared by both FIFOs
    fifo_pos: usize,
    /// Samples since the last frame
    hop_counter: usize,
}

impl OverlapAdd {
    pub fn new() -> Self {
        Self {
            input_fifo: [0.0; FFT_SIZE],
            output_fifo: [0.0; FFT_SIZE],
            fifo_pos: 0,
            hop_counter: 0,
        }
    }

    pub fn reset(&mut self) {
        self.input_fifo.fill(0.0);
        self.output_fifo.fill(0.0);
        self.fifo_pos = 0;
        self.hop_counter = 0;
    }

    /// Push one input sample and pop one output sample
    #[inline]
    pub fn push(&mut self, input: f32) -> (f32, FrameState) {
        self.input_fifo[self.fifo_pos] = input;

        let output = self.output_fifo[self.fifo_pos];
        self.output_fifo[self.fifo_pos] = 0.0;

        self.fifo_pos = (self.fifo_pos + 1) % FFT_SIZE;
        self.hop_counter += 1;

        if self.hop_counter >= HOP_SIZE {
            self.hop_counter = 0;
            (output, FrameState::FrameReady)
        } else {
            (output, FrameState::Accumulating)
        }
    }

    /// Copy the input FIFO into `frame`, oldest sample first
    pub fn unwrap_frame(&self, frame: &mut [f32]) {
        if frame.len() < FFT_SIZE {
            return;
        }
        let tail = FFT_SIZE - self.fifo_pos;
        frame[..tail].copy_from_slice(&self.input_fifo[self.fifo_pos..]);
        frame[tail..FFT_SIZE].copy_from_slice(&self.input_fifo[..self.fifo_pos]);
    }

    /// Add a processed frame into the output FIFO, aligned with `unwrap_frame`
    pub fn overlap_add(&mut self, frame: &[f32]) {
        for (i, &s) in frame.iter().take(FFT_SIZE).enumerate() {
            let idx = (self.fifo_pos + i) % FFT_SIZE;
            self.output_fifo[idx] += s;
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.fifo_pos
    }
}

impl Default for OverlapAdd {
    fn default() -> Self {
        Self::new()
    }
}
