//! Retrospective safeguard threshold search.
//!
//! A stimulus was safeguarded at some threshold, played and recorded, but
//! the threshold is unknown (or a better one is wanted after the fact). The
//! optimizer re-safeguards the original template at each candidate
//! threshold, deconvolves the raw recording against it, refines the LTI
//! window and compares the result to a reference refined response. The
//! threshold whose response matches the reference best wins.
//!
//! With the `parallel` feature candidates are evaluated on the rayon pool.
//! Results are gathered in sweep order and reduced sequentially, so the
//! selection never depends on scheduling.

use crate::deconvolve::{DeconvolveParams, SingularityPolicy, deconvolve};
use crate::error::{Error, Result};
use crate::refine::TransferFunctionEstimate;
use crate::safeguard::Safeguard;
use crate::signal::Signal;
use crate::taper::TaperBand;
use crate::window::{AnalysisWindow, seconds_to_samples};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lowest magnitude scale tried when matching a candidate to the reference.
pub const SCALE_MIN: f64 = 0.9;

/// Scale sweep increment.
pub const SCALE_STEP: f64 = 0.001;

/// Number of scales in the sweep, `[0.9, 1.1]` inclusive.
pub const SCALE_STEPS: usize = 201;

/// Seconds before the pre-delay point at which the comparison starts.
pub const COMPARISON_LEAD_S: f64 = 0.01;

/// Shared flag that asks a running sweep to stop.
///
/// Cloning shares the flag. The sweep checks it before every candidate.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Sweep parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptimizeParams {
    /// Candidate thresholds in dB, in sweep order.
    pub thresholds_db: Vec<f64>,
    /// Upper frequency limit passed to the safeguard.
    pub high_freq_limit_hz: f64,
    /// Taper cutoffs for every candidate's refined response.
    pub band: TaperBand,
    /// LTI window of the reference response, applied to every candidate.
    pub lti_window: AnalysisWindow,
    /// Pre-delay the LTI window was built with, in seconds.
    pub pre_delay_s: f64,
    /// Deconvolution singularity handling.
    #[serde(skip)]
    pub singularity: SingularityPolicy,
}

/// Score of one threshold.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThresholdCandidate {
    /// Threshold in dB.
    pub threshold_db: f64,
    /// `20 log10` of the best normalized error, or `None` if the candidate
    /// could not be scored.
    pub error_db: Option<f64>,
    /// Magnitude scale at which the error was lowest.
    pub scale: Option<f64>,
    /// Why the candidate was excluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ThresholdCandidate {
    fn excluded(threshold_db: f64, reason: String) -> Self {
        Self {
            threshold_db,
            error_db: None,
            scale: None,
            reason: Some(reason),
        }
    }
}

/// Winning threshold and the full error curve.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptimizationResult {
    /// Threshold with the lowest error.
    pub best_threshold_db: f64,
    /// Error of the winning threshold, in dB.
    pub best_error_db: f64,
    /// Best-fit magnitude scale of the winning threshold.
    pub best_scale: f64,
    /// Every candidate in sweep order.
    pub candidates: Vec<ThresholdCandidate>,
}

type ProgressFn<'a> = dyn Fn(&ThresholdCandidate) + Send + Sync + 'a;

/// Searches safeguard thresholds for the one that best reproduces a
/// reference refined response.
///
/// # Example
///
/// ```rust,no_run
/// use retrosg_analysis::{
///     AnalysisWindow, CancellationToken, OptimizeParams, SpectralFloorSafeguard, TaperBand,
///     ThresholdOptimizer,
/// };
///
/// # fn load() -> (Vec<f64>, Vec<f64>, Vec<f64>) { unimplemented!() }
/// let (reference, recorded, template) = load();
/// let params = OptimizeParams {
///     thresholds_db: vec![-80.0, -60.0, -40.0, -20.0],
///     high_freq_limit_hz: 20000.0,
///     band: TaperBand::new(100.0, 18000.0),
///     lti_window: AnalysisWindow { start: 2400, length: 24000 },
///     pre_delay_s: 0.05,
///     singularity: Default::default(),
/// };
/// let token = CancellationToken::new();
/// let result = ThresholdOptimizer::new(&SpectralFloorSafeguard, params)
///     .with_cancellation(token)
///     .run(&reference, &recorded, &template, 48000.0)
///     .unwrap();
/// println!("best threshold: {} dB", result.best_threshold_db);
/// ```
pub struct ThresholdOptimizer<'a, S: Safeguard + ?Sized> {
    safeguard: &'a S,
    params: OptimizeParams,
    cancellation: Option<CancellationToken>,
    progress: Option<Box<ProgressFn<'a>>>,
}

impl<'a, S: Safeguard + ?Sized> ThresholdOptimizer<'a, S> {
    /// Create an optimizer around a safeguard implementation.
    pub fn new(safeguard: &'a S, params: OptimizeParams) -> Self {
        Self {
            safeguard,
            params,
            cancellation: None,
            progress: None,
        }
    }

    /// Stop the sweep when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Call `f` after every evaluated candidate.
    ///
    /// Under the `parallel` feature `f` runs on worker threads and may see
    /// candidates out of sweep order.
    pub fn on_progress(mut self, f: impl Fn(&ThresholdCandidate) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Run the sweep.
    ///
    /// # Arguments
    /// * `reference` - reference refined impulse response (one channel)
    /// * `recorded` - raw recording made with the unknown-threshold stimulus
    /// * `template` - unsafeguarded stimulus the safeguard is applied to
    /// * `sample_rate` - common sample rate in Hz
    pub fn run(
        &self,
        reference: &[f64],
        recorded: &[f64],
        template: &[f64],
        sample_rate: f64,
    ) -> Result<OptimizationResult> {
        let comparison = self.validate(reference, recorded, template, sample_rate)?;
        let recorded = Signal::mono(recorded.to_vec(), sample_rate)?;
        let context = Context {
            reference: &reference[comparison.clone()],
            recorded: &recorded,
            template,
            sample_rate,
            comparison,
        };

        let candidates = self.sweep(&context)?;
        select(candidates)
    }

    fn validate(
        &self,
        reference: &[f64],
        recorded: &[f64],
        template: &[f64],
        sample_rate: f64,
    ) -> Result<std::ops::Range<usize>> {
        let params = &self.params;
        if params.thresholds_db.is_empty() {
            return Err(Error::config("no threshold candidates to sweep"));
        }
        if let Some(t) = params.thresholds_db.iter().find(|t| !t.is_finite()) {
            return Err(Error::config(format!("threshold candidate {t} is not finite")));
        }
        params.band.validate(sample_rate)?;
        if recorded.len() != template.len() {
            return Err(Error::config(format!(
                "length mismatch: recorded {} samples, template {} samples",
                recorded.len(),
                template.len()
            )));
        }
        if params.lti_window.end() > recorded.len() {
            return Err(Error::Bounds {
                what: "LTI window",
                start: params.lti_window.start as i64,
                end: params.lti_window.end() as i64,
                len: recorded.len(),
            });
        }
        if !(params.pre_delay_s.is_finite() && params.pre_delay_s >= 0.0) {
            return Err(Error::config(format!(
                "pre-delay must be non-negative, got {} s",
                params.pre_delay_s
            )));
        }

        let start = seconds_to_samples((params.pre_delay_s - COMPARISON_LEAD_S).max(0.0), sample_rate);
        let end = params.lti_window.length;
        if end > reference.len() {
            return Err(Error::Bounds {
                what: "comparison window",
                start: start as i64,
                end: end as i64,
                len: reference.len(),
            });
        }
        if end < start + 2 {
            return Err(Error::config(format!(
                "comparison window [{start}, {end}) needs at least 2 samples"
            )));
        }
        if let Some(offset) = reference[start..end].iter().position(|s| !s.is_finite()) {
            return Err(Error::config(format!(
                "reference response has a non-finite sample at index {} of the comparison window",
                start + offset
            )));
        }
        if standard_deviation(reference[start..end].iter().copied()) == 0.0 {
            return Err(Error::config("reference response has zero variance over the comparison window"));
        }
        Ok(start..end)
    }

    #[cfg(not(feature = "parallel"))]
    fn sweep(&self, context: &Context<'_>) -> Result<Vec<ThresholdCandidate>> {
        let mut candidates = Vec::with_capacity(self.params.thresholds_db.len());
        for &threshold_db in &self.params.thresholds_db {
            if self.is_cancelled() {
                return Err(Error::Cancelled {
                    evaluated: candidates.len(),
                });
            }
            candidates.push(self.evaluate(context, threshold_db));
        }
        Ok(candidates)
    }

    #[cfg(feature = "parallel")]
    fn sweep(&self, context: &Context<'_>) -> Result<Vec<ThresholdCandidate>> {
        use rayon::prelude::*;

        let gathered: Vec<Option<ThresholdCandidate>> = self
            .params
            .thresholds_db
            .par_iter()
            .map(|&threshold_db| (!self.is_cancelled()).then(|| self.evaluate(context, threshold_db)))
            .collect();

        let evaluated = gathered.iter().filter(|c| c.is_some()).count();
        if evaluated < gathered.len() {
            return Err(Error::Cancelled { evaluated });
        }
        Ok(gathered.into_iter().flatten().collect())
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn evaluate(&self, context: &Context<'_>, threshold_db: f64) -> ThresholdCandidate {
        let candidate = match self.score(context, threshold_db) {
            Ok((error_db, scale)) => {
                tracing::debug!(threshold_db, error_db, scale, "scored threshold candidate");
                ThresholdCandidate {
                    threshold_db,
                    error_db: Some(error_db),
                    scale: Some(scale),
                    reason: None,
                }
            }
            Err(e) => {
                tracing::warn!(threshold_db, error = %e, "excluded threshold candidate");
                ThresholdCandidate::excluded(threshold_db, e.to_string())
            }
        };
        if let Some(progress) = &self.progress {
            progress(&candidate);
        }
        candidate
    }

    fn score(&self, context: &Context<'_>, threshold_db: f64) -> Result<(f64, f64)> {
        let params = &self.params;
        let output = self.safeguard.safeguard(
            context.template,
            context.sample_rate,
            context.sample_rate,
            threshold_db,
            params.high_freq_limit_hz,
        )?;
        if output.signal.len() != context.recorded.len() {
            return Err(Error::Safeguard(format!(
                "safeguarded stimulus has {} samples, recording has {}",
                output.signal.len(),
                context.recorded.len()
            )));
        }

        let played = Signal::mono(output.signal, context.sample_rate)?;
        let deconvolution = deconvolve(
            context.recorded,
            &played,
            &DeconvolveParams {
                singularity: params.singularity,
            },
        )?;
        let ir = deconvolution.impulse_response.channel(0)?;
        let (_, response, _) =
            TransferFunctionEstimate::from_window(ir, params.lti_window, context.sample_rate, params.band)?;

        let candidate = &response[context.comparison.clone()];
        if candidate.iter().any(|s| !s.is_finite()) {
            return Err(Error::config("refined response contains non-finite samples"));
        }
        let (error_db, scale) = best_scale_error_db(candidate, context.reference);
        if !error_db.is_finite() {
            return Err(Error::config(format!("candidate error is not finite ({error_db} dB)")));
        }
        Ok((error_db, scale))
    }
}

struct Context<'c> {
    reference: &'c [f64],
    recorded: &'c Signal,
    template: &'c [f64],
    sample_rate: f64,
    comparison: std::ops::Range<usize>,
}

/// Pick the lowest-error candidate; the first one wins a tie. Non-finite
/// errors never win.
fn select(candidates: Vec<ThresholdCandidate>) -> Result<OptimizationResult> {
    let mut best: Option<(f64, f64, f64)> = None;
    for c in &candidates {
        if let (Some(error_db), Some(scale)) = (c.error_db, c.scale)
            && error_db.is_finite()
            && best.is_none_or(|(_, e, _)| error_db < e)
        {
            best = Some((c.threshold_db, error_db, scale));
        }
    }
    let (best_threshold_db, best_error_db, best_scale) = best.ok_or(Error::NoViableCandidate)?;
    tracing::debug!(best_threshold_db, best_error_db, best_scale, "threshold sweep finished");
    Ok(OptimizationResult {
        best_threshold_db,
        best_error_db,
        best_scale,
        candidates,
    })
}

/// Sweep the magnitude scale and return `(20 log10(min error), scale)`.
///
/// `error(scale) = std(candidate * scale - reference) / std(reference)`, with
/// sample standard deviations. The ratio is floored at `f64::MIN_POSITIVE`.
pub fn best_scale_error_db(candidate: &[f64], reference: &[f64]) -> (f64, f64) {
    let reference_std = standard_deviation(reference.iter().copied());
    let mut best_error = f64::INFINITY;
    let mut best_scale = SCALE_MIN;
    for i in 0..SCALE_STEPS {
        let scale = SCALE_MIN + i as f64 * SCALE_STEP;
        let residual = candidate.iter().zip(reference).map(|(c, r)| c * scale - r);
        let error = standard_deviation(residual) / reference_std;
        if error < best_error {
            best_error = error;
            best_scale = scale;
        }
    }
    (20.0 * best_error.max(f64::MIN_POSITIVE).log10(), best_scale)
}

/// Sample standard deviation (`N - 1` denominator). Zero for fewer than two
/// values.
fn standard_deviation(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
    if count < 2 {
        return 0.0;
    }
    let mean = sum / count as f64;
    let squares: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
    (squares / (count - 1) as f64).sqrt()
}
