//! End-to-end behaviour of `RippleEngine` through the public API

use ripple_audio::spectral::FFT_SIZE;
use ripple_audio::{
    load_into, serialize_state, EngineError, ModTarget, ParamId, Params, RippleEngine,
    NUM_RIPPLE_BANDS,
};
use std::sync::Arc;

const SAMPLE_RATE: f64 = 48000.0;

fn engine_with(params: Arc<Params>, block: usize) -> RippleEngine {
    let mut engine = RippleEngine::new(params);
    engine.prepare(SAMPLE_RATE, block).expect("prepare");
    engine
}

/// Run stereo audio through the engine in `block`-sized calls
fn run_stereo(
    engine: &mut RippleEngine,
    left: &[f32],
    right: &[f32],
    block: usize,
) -> (Vec<f32>, Vec<f32>) {
    let mut out_l = Vec::with_capacity(left.len());
    let mut out_r = Vec::with_capacity(right.len());
    for (l, r) in left.chunks(block).zip(right.chunks(block)) {
        let mut bl = l.to_vec();
        let mut br = r.to_vec();
        {
            let mut channels: [&mut [f32]; 2] = [&mut bl, &mut br];
            engine.process(&mut channels);
        }
        out_l.extend_from_slice(&bl);
        out_r.extend_from_slice(&br);
    }
    (out_l, out_r)
}

fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0f32, |p, s| p.max(s.abs()))
}

fn tone(len: usize, freq: f32, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|n| (std::f32::consts::TAU * freq * n as f32 / SAMPLE_RATE as f32).sin() * amp)
        .collect()
}

#[test]
fn test_silence_in_silence_out() {
    const MAX_BLOCK: usize = 4096;

    for sample_rate in [44100.0, 96000.0, 192000.0] {
        for block in [1, 64, MAX_BLOCK, MAX_BLOCK + 1] {
            // spectral, ripple, both
            for core in [0.0, 1.0, 2.0] {
                let params = Arc::new(Params::new());
                params.set(ParamId::Core, core);
                params.set(ParamId::ReverbEnabled, 1.0);
                params.set(ParamId::Smear, 0.7);
                params.set(ParamId::Scatter, 0.5);
                params.set(ParamId::Feedback, 0.6);
                params.set(ParamId::Mod1Source, 1.0);
                params.set(ParamId::Mod1Target, ModTarget::RippleAmount.index() as f32);
                params.set(ParamId::Mod1Depth, 1.0);
                let mut engine = RippleEngine::new(params);
                engine.prepare(sample_rate, MAX_BLOCK).expect("prepare");

                let len = (FFT_SIZE * 4).max(block * 2);
                let silence = vec![0.0f32; len];
                let (l, r) = run_stereo(&mut engine, &silence, &silence, block);
                let context = format!("rate {} block {} core {}", sample_rate, block, core);
                assert!(peak(&l) < 1e-9, "{}", context);
                assert!(peak(&r) < 1e-9, "{}", context);
                assert_eq!(engine.meters().output_level(), 0.0, "{}", context);
            }
        }
    }
}

#[test]
fn test_spectral_impulse_arrives_after_fft_size() {
    let params = Arc::new(Params::new());
    params.set(ParamId::Core, 0.0);
    let mut engine = engine_with(params, 256);
    assert_eq!(engine.latency_samples(), FFT_SIZE);

    let mut input = vec![0.0f32; FFT_SIZE * 4];
    input[0] = 1.0;
    let (l, r) = run_stereo(&mut engine, &input, &input, 256);

    for n in 0..l.len() {
        let expected = if n == FFT_SIZE { 1.0 } else { 0.0 };
        assert!((l[n] - expected).abs() < 1e-3, "left[{}] = {}", n, l[n]);
        assert!((r[n] - expected).abs() < 1e-3, "right[{}] = {}", n, r[n]);
    }
}

#[test]
fn test_spectral_round_trip_with_effects_off() {
    let params = Arc::new(Params::new());
    params.set(ParamId::Core, 0.0);
    let mut engine = engine_with(params, 480);

    let input: Vec<f32> = (0..FFT_SIZE * 10)
        .map(|n| (n as f32 * 0.013).sin() * 0.6 + (n as f32 * 0.4).cos() * 0.1)
        .collect();
    let (l, _) = run_stereo(&mut engine, &input, &input, 480);

    for n in FFT_SIZE * 2..input.len() {
        assert!((l[n] - input[n - FFT_SIZE]).abs() < 1e-3, "sample {}", n);
    }
}

#[test]
fn test_reverb_tail_decays() {
    let params = Arc::new(Params::new());
    params.set(ParamId::RippleMix, 0.0);
    params.set(ParamId::ReverbEnabled, 1.0);
    params.set(ParamId::ReverbMix, 1.0);
    params.set(ParamId::ReverbSize, 0.5);
    let mut engine = engine_with(params, 1024);

    let len = SAMPLE_RATE as usize * 10;
    let mut input = vec![0.0f32; len];
    input[0] = 1.0;
    let (l, r) = run_stereo(&mut engine, &input, &input, 1024);

    let early = SAMPLE_RATE as usize / 10;
    assert!(peak(&l[..early]) > 1e-3, "no reverb response");
    let late = SAMPLE_RATE as usize * 8;
    assert!(peak(&l[late..]) < 1e-4);
    assert!(peak(&r[late..]) < 1e-4);
}

#[test]
fn test_freeze_holds_spectrum_after_input_stops() {
    let tone_len = SAMPLE_RATE as usize * 5;
    let silence_len = SAMPLE_RATE as usize;
    let mut input = tone(tone_len, 750.0, 0.5);
    input.extend(std::iter::repeat(0.0).take(silence_len));

    let run = |freeze: f32| {
        let params = Arc::new(Params::new());
        params.set(ParamId::Core, 0.0);
        params.set(ParamId::Freeze, freeze);
        let mut engine = engine_with(params, 512);
        let (l, _) = run_stereo(&mut engine, &input, &input, 512);
        l
    };

    // Skip the latency and the last frame containing tone
    let tail_start = tone_len + FFT_SIZE * 2;
    let frozen = run(1.0);
    let dry = run(0.0);

    assert!(peak(&dry[tail_start..]) < 1e-3);
    assert!(peak(&frozen[tail_start..]) > 0.05);
}

#[test]
fn test_bypass_passes_input_unchanged() {
    let params = Arc::new(Params::new());
    params.set(ParamId::Core, 2.0);
    params.set(ParamId::ReverbEnabled, 1.0);
    params.set(ParamId::Bypass, 1.0);
    let mut engine = engine_with(params.clone(), 256);

    let input = tone(4096, 440.0, 0.8);
    let (l, r) = run_stereo(&mut engine, &input, &input, 256);
    assert_eq!(l, input);
    assert_eq!(r, input);

    // Turning bypass off changes the output
    params.set(ParamId::Bypass, 0.0);
    let (l, _) = run_stereo(&mut engine, &input, &input, 256);
    assert_ne!(l, input);
}

#[test]
fn test_oversized_blocks_match_small_blocks() {
    let params = Arc::new(Params::new());
    params.set(ParamId::Core, 2.0);
    params.set(ParamId::ReverbEnabled, 1.0);
    params.set(ParamId::Smear, 0.4);

    let mut split = engine_with(params.clone(), 128);
    let mut whole = engine_with(params, 128);

    let left = tone(8192, 300.0, 0.5);
    let right = tone(8192, 1200.0, 0.3);
    let (sl, sr) = run_stereo(&mut split, &left, &right, 128);
    // A single call far larger than the prepared block size
    let (wl, wr) = run_stereo(&mut whole, &left, &right, 8192);

    for n in 0..left.len() {
        assert!((sl[n] - wl[n]).abs() < 1e-6, "left {}", n);
        assert!((sr[n] - wr[n]).abs() < 1e-6, "right {}", n);
    }
}

#[test]
fn test_lfo_routing_moves_band_gains() {
    let params = Arc::new(Params::new());
    params.set(ParamId::RippleRate, 0.01);
    params.set(ParamId::Lfo1Rate, 5.0);
    params.set(ParamId::Lfo1Shape, 2.0);
    params.set(ParamId::Mod1Source, 1.0);
    params.set(ParamId::Mod1Target, ModTarget::RippleAmount.index() as f32);
    params.set(ParamId::Mod1Depth, 1.0);
    let mut engine = engine_with(params, 480);

    let input = vec![0.1f32; 480];
    let mut seen = Vec::new();
    for _ in 0..20 {
        run_stereo(&mut engine, &input, &input, 480);
        let mut bands = [0.0f32; NUM_RIPPLE_BANDS];
        engine.meters().ripple_bands(&mut bands);
        seen.push(bands);
    }

    // A 5 Hz square over 20 blocks of 10 ms flips the amount several times
    let first = seen[0];
    assert!(seen.iter().any(|b| b.iter().zip(&first).any(|(x, y)| (x - y).abs() > 1e-3)));
    for bands in &seen {
        assert!(bands.iter().all(|g| (0.0..=1.0).contains(g)));
    }
}

#[test]
fn test_state_from_other_version_loads_known_fields() {
    let params = Arc::new(Params::new());
    let text = "# older\nversion=2\nfreeze=0.4\ncore=0\nold_knob=3\n";
    let report = load_into(&params, text);

    assert_eq!(report.version, Some(2));
    assert!(!report.is_current_version());
    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(params.get(ParamId::Freeze), 0.4);
    assert_eq!(params.get(ParamId::ReverbMix), 0.3);

    let engine = engine_with(params.clone(), 64);
    assert_eq!(engine.latency_samples(), FFT_SIZE);

    // Saving and reloading reproduces every value
    let saved = serialize_state(&params.snapshot());
    let restored = Params::new();
    let report = load_into(&restored, &saved);
    assert!(report.is_current_version());
    for id in ParamId::ALL {
        assert!((restored.get(id) - params.get(id)).abs() < 1e-5, "{:?}", id);
    }
}

#[test]
fn test_prepare_rejects_bad_configuration() {
    let mut engine = RippleEngine::new(Arc::new(Params::new()));
    assert!(matches!(
        engine.prepare(f64::NAN, 256),
        Err(EngineError::InvalidSampleRate(_))
    ));
    assert_eq!(
        engine.prepare(48000.0, 1 << 20),
        Err(EngineError::InvalidBlockSize(1 << 20))
    );
}
