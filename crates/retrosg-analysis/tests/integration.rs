//! Integration tests for retrosg-analysis crate.
//!
//! Tests run the measurement pipeline end to end on synthetic systems with
//! known impulse responses: deconvolution, windowing, tapering and the
//! retrospective threshold search.

use std::f64::consts::PI;

use retrosg_analysis::{
    DeconvolveParams, Error, OptimizeParams, RefineParams, Safeguard, Signal,
    SingularityPolicy, SpectralFloorSafeguard, Spectrum, TaperBand, ThresholdOptimizer,
    deconvolve, refine,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Deterministic white noise in [-1, 1).
fn white_noise(len: usize, seed: u32) -> Vec<f64> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as i32 as f64) / (i32::MAX as f64)
        })
        .collect()
}

/// White noise through a one-pole lowpass, giving a tilted spectrum.
fn tilted_noise(len: usize, seed: u32) -> Vec<f64> {
    let mut y = 0.0;
    white_noise(len, seed)
        .into_iter()
        .map(|x| {
            y = 0.98 * y + x;
            y
        })
        .collect()
}

/// A room-like response: unit direct path after `delay` samples followed by
/// a decaying ringing tail.
fn room_response(len: usize, delay: usize, sample_rate: f64) -> Vec<f64> {
    (0..len)
        .map(|i| {
            if i < delay {
                return 0.0;
            }
            let t = (i - delay) as f64 / sample_rate;
            if i == delay {
                1.0
            } else {
                0.4 * (-t * 40.0).exp() * (2.0 * PI * 1000.0 * t).cos()
            }
        })
        .collect()
}

/// Circular convolution over one full DFT cycle.
fn circular_convolve(a: &[f64], b: &[f64], sample_rate: f64) -> Vec<f64> {
    let mut product = Spectrum::from_real(a, sample_rate);
    let other = Spectrum::from_real(b, sample_rate);
    for (x, y) in product.bins.iter_mut().zip(&other.bins) {
        *x *= y;
    }
    product.to_real().0
}

// ===========================================================================
// 1. Deconvolution → windows → taper
// ===========================================================================

#[test]
fn end_to_end_stereo_pipeline_attenuates_outside_band() {
    let fs = 48000.0;
    let n = 48000;
    let stimulus = white_noise(n, 0x2468_ace1);

    // Close and far channels, 0.1 s and 0.11 s of acoustic latency.
    let close = circular_convolve(&room_response(n, 4800, fs), &stimulus, fs);
    let far = circular_convolve(&room_response(n, 5280, fs), &stimulus, fs);
    let recorded = Signal::stereo(close, far, fs).unwrap();
    let played = Signal::mono(stimulus, fs).unwrap();

    let raw = deconvolve(&recorded, &played, &DeconvolveParams::default()).unwrap();
    assert!(!raw.has_singularities());
    assert_eq!(raw.impulse_response.len(), n);

    let band = TaperBand::new(100.0, 18000.0);
    let refined = refine(
        &raw.impulse_response,
        &RefineParams {
            reference_channel: 0,
            pre_delay_s: 0.05,
            window_duration_s: 0.5,
            band,
        },
    )
    .unwrap();

    assert_eq!(refined.peak_index, 4800);
    assert_eq!(refined.windows.lti.start, 2400);
    assert_eq!(refined.windows.lti.length, 24000);
    assert_eq!(refined.windows.noise.start, 24000);
    assert!(refined.imaginary_residual < 1e-9);

    for estimate in &refined.lti {
        let spectrum = &estimate.spectrum.tapered;
        let original = &estimate.spectrum.original;
        let freqs = spectrum.frequencies();
        let nyquist_bin = spectrum.len() / 2;

        // Bins below the low cutoff grow monotonically toward it.
        for k in 0..nyquist_bin {
            if freqs[k + 1] < band.low_cut_hz {
                assert!(
                    spectrum.bins[k].norm() <= spectrum.bins[k + 1].norm() * (1.0 + 1e-12),
                    "low roll-off not monotonic at {} Hz",
                    freqs[k]
                );
            }
        }
        // Bins above the high cutoff shrink monotonically toward Nyquist.
        for k in 0..nyquist_bin {
            if freqs[k] > band.high_cut_hz {
                assert!(
                    spectrum.bins[k + 1].norm() <= spectrum.bins[k].norm() * (1.0 + 1e-12),
                    "high roll-off not monotonic at {} Hz",
                    freqs[k]
                );
            }
        }
        // Passband untouched.
        for k in 0..=nyquist_bin {
            if freqs[k] > band.low_cut_hz && freqs[k] < band.high_cut_hz {
                assert_eq!(spectrum.bins[k], original.bins[k]);
            }
        }
        assert_eq!(spectrum.bins[0].norm(), 0.0);
        assert!(spectrum.bins[nyquist_bin].norm() < 1e-9);
    }
}

#[test]
fn identical_pair_puts_peak_at_zero_and_fails_bounds() {
    let fs = 48000.0;
    let x = white_noise(48000, 0x1357_9bdf);
    let signal = Signal::stereo(x.clone(), x, fs).unwrap();

    let raw = deconvolve(&signal, &signal, &DeconvolveParams::default()).unwrap();
    let ir = raw.impulse_response.channel(0).unwrap();
    assert!((ir[0] - 1.0).abs() < 1e-9);
    assert!(ir[1..].iter().all(|s| s.abs() < 1e-9));

    let err = refine(&raw.impulse_response, &RefineParams::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Bounds {
            what: "LTI window",
            start: -2400,
            ..
        }
    ));
}

#[test]
fn floor_policy_keeps_response_finite_with_silent_bins() {
    let fs = 8000.0;
    // A stimulus with an exact spectral null at DC.
    let played: Vec<f64> = (0..1024).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    let recorded = played.clone();
    let played = Signal::mono(played, fs).unwrap();
    let recorded = Signal::mono(recorded, fs).unwrap();

    let propagated = deconvolve(&recorded, &played, &DeconvolveParams::default()).unwrap();
    assert!(propagated.has_singularities());

    let floored = deconvolve(
        &recorded,
        &played,
        &DeconvolveParams {
            singularity: SingularityPolicy::Floor { relative: 1e-6 },
        },
    )
    .unwrap();
    assert!(floored.impulse_response.is_finite());
    assert_eq!(floored.singular_bins, propagated.singular_bins);
}

// ===========================================================================
// 2. Retrospective threshold search
// ===========================================================================

#[test]
fn optimizer_recovers_known_threshold() {
    let fs = 16000.0;
    let n = 16000;
    let true_threshold_db = -40.0;
    let high_freq_limit_hz = 8000.0;
    let band = TaperBand::new(100.0, 6000.0);

    let template = tilted_noise(n, 0x0bad_cafe);
    let stimulus = SpectralFloorSafeguard
        .safeguard(&template, fs, fs, true_threshold_db, high_freq_limit_hz)
        .unwrap()
        .signal;
    let recorded = circular_convolve(&room_response(n, 400, fs), &stimulus, fs);

    // Reference: the response refined against the stimulus actually played.
    let raw = deconvolve(
        &Signal::mono(recorded.clone(), fs).unwrap(),
        &Signal::mono(stimulus, fs).unwrap(),
        &DeconvolveParams::default(),
    )
    .unwrap();
    let refine_params = RefineParams {
        reference_channel: 0,
        pre_delay_s: 0.01,
        window_duration_s: 0.25,
        band,
    };
    let reference = refine(&raw.impulse_response, &refine_params).unwrap();

    let params = OptimizeParams {
        thresholds_db: vec![-80.0, -60.0, -40.0, -20.0],
        high_freq_limit_hz,
        band,
        lti_window: reference.windows.lti,
        pre_delay_s: refine_params.pre_delay_s,
        singularity: SingularityPolicy::Propagate,
    };
    let result = ThresholdOptimizer::new(&SpectralFloorSafeguard, params)
        .run(
            reference.impulse_response.channel(0).unwrap(),
            &recorded,
            &template,
            fs,
        )
        .unwrap();

    assert_eq!(result.best_threshold_db, true_threshold_db);
    assert_eq!(result.candidates.len(), 4);
    assert!(result.candidates.iter().all(|c| c.error_db.is_some()));
    for candidate in &result.candidates {
        if candidate.threshold_db != true_threshold_db {
            assert!(
                candidate.error_db.unwrap() > result.best_error_db + 20.0,
                "{} dB scored {:?}",
                candidate.threshold_db,
                candidate.error_db
            );
        }
    }
}

#[test]
fn optimization_result_serializes() {
    let result = retrosg_analysis::OptimizationResult {
        best_threshold_db: -40.0,
        best_error_db: -62.5,
        best_scale: 1.0,
        candidates: vec![retrosg_analysis::ThresholdCandidate {
            threshold_db: -40.0,
            error_db: Some(-62.5),
            scale: Some(1.0),
            reason: None,
        }],
    };
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"best_threshold_db\":-40.0"));
    let back: retrosg_analysis::OptimizationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}
