//! Trajectory feature extraction for the neural decoder.
//!
//! Converts raw touch samples into the exact `[x, y, vx, vy, ax, ay]`
//! representation the trajectory model was trained on. The math here is a
//! hard compatibility contract, not a style choice: timestamps are in
//! milliseconds, the first point has zero derivatives by definition, and
//! velocities/accelerations are finite differences clipped to ±10. Using
//! seconds instead of milliseconds would silently wreck prediction quality
//! without ever raising an error.

/// Number of values per feature point, fixing the model input width.
pub const FEATURE_DIMENSIONS: usize = 6;

/// Clipping bound applied to velocity and acceleration components.
const DERIVATIVE_CLIP: f32 = 10.0;

/// Floor for inter-sample deltas, guarding against duplicate timestamps.
const MIN_DT_MS: f32 = 1e-6;

/// One touch sample in model feature space.
///
/// `x`/`y` are keyboard-normalized to `[0, 1]`; the derivative components
/// are clipped to `[-10, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeaturePoint {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub ax: f32,
    pub ay: f32,
}

impl FeaturePoint {
    /// Flatten into the row layout the model tensor expects.
    pub fn to_array(&self) -> [f32; FEATURE_DIMENSIONS] {
        [self.x, self.y, self.vx, self.vy, self.ax, self.ay]
    }
}

fn clip(value: f32) -> f32 {
    value.clamp(-DERIVATIVE_CLIP, DERIVATIVE_CLIP)
}

/// Compute feature points from parallel position and timestamp arrays.
///
/// Timestamps are milliseconds. Point 0 carries zero velocity and
/// acceleration; later points use backward differences with `dt` floored at
/// [`MIN_DT_MS`]. Mismatched array lengths yield an empty sequence.
pub fn calculate_features(xs: &[f32], ys: &[f32], timestamps_ms: &[f32]) -> Vec<FeaturePoint> {
    let mut out = Vec::new();
    calculate_features_into(xs, ys, timestamps_ms, &mut out);
    out
}

/// Streaming variant of [`calculate_features`] writing into a caller-owned
/// buffer.
///
/// The buffer is cleared and refilled in place, so a reused buffer makes the
/// call allocation-free once grown. This is the path the latency-sensitive
/// swipe-in-progress loop uses; one buffer must never be shared between
/// concurrent swipes. Output is numerically identical to the non-streaming
/// variant.
pub fn calculate_features_into(
    xs: &[f32],
    ys: &[f32],
    timestamps_ms: &[f32],
    out: &mut Vec<FeaturePoint>,
) {
    out.clear();
    if xs.len() != ys.len() || xs.len() != timestamps_ms.len() {
        tracing::warn!(
            xs = xs.len(),
            ys = ys.len(),
            timestamps = timestamps_ms.len(),
            "mismatched sample arrays, producing no features"
        );
        return;
    }
    for i in 0..xs.len() {
        if i == 0 {
            out.push(FeaturePoint {
                x: xs[0],
                y: ys[0],
                ..FeaturePoint::default()
            });
            continue;
        }
        let dt = (timestamps_ms[i] - timestamps_ms[i - 1]).max(MIN_DT_MS);
        let vx = clip((xs[i] - xs[i - 1]) / dt);
        let vy = clip((ys[i] - ys[i - 1]) / dt);
        let prev = out[i - 1];
        out.push(FeaturePoint {
            x: xs[i],
            y: ys[i],
            vx,
            vy,
            ax: clip((vx - prev.vx) / dt),
            ay: clip((vy - prev.vy) / dt),
        });
    }
}

/// Fallback for samples that arrived without timestamps.
///
/// Synthesizes a uniform 1 ms spacing. Lower fidelity than real timestamps,
/// since actual swipe speed no longer modulates the velocity features.
pub fn calculate_features_without_timestamps(xs: &[f32], ys: &[f32]) -> Vec<FeaturePoint> {
    tracing::debug!(
        samples = xs.len(),
        "no timestamps available, synthesizing 1ms sample spacing"
    );
    let timestamps: Vec<f32> = (0..xs.len()).map(|i| i as f32).collect();
    calculate_features(xs, ys, &timestamps)
}

/// Fit a feature sequence to the model's fixed input length.
///
/// Truncates from the end or pads with all-zero points. Returns the fixed
/// sequence together with the true pre-padding length, which the model
/// consumes as its effective-length marker.
pub fn pad_or_truncate(
    features: &[FeaturePoint],
    target_length: usize,
) -> (Vec<FeaturePoint>, usize) {
    let valid_length = features.len().min(target_length);
    let mut out = Vec::with_capacity(target_length);
    out.extend_from_slice(&features[..valid_length]);
    out.resize(target_length, FeaturePoint::default());
    (out, valid_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-9;

    #[test]
    fn reference_vectors_match_training_math() {
        let features = calculate_features(&[0.0, 0.1], &[0.0, 0.1], &[0.0, 100.0]);
        assert_eq!(features.len(), 2);

        let first = features[0];
        assert_eq!(first.vx, 0.0);
        assert_eq!(first.vy, 0.0);
        assert_eq!(first.ax, 0.0);

        let second = features[1];
        assert!((second.vx - 0.001).abs() < EPS);
        assert!((second.vy - 0.001).abs() < EPS);
        // (0.001 - 0) / 100
        assert!((second.ax - 1e-5).abs() < EPS);
        assert!((second.ay - 1e-5).abs() < EPS);
    }

    #[test]
    fn derivatives_are_clipped() {
        // huge jump over a duplicate timestamp hits the dt floor, then clips
        let features = calculate_features(&[0.0, 1.0], &[0.0, 1.0], &[5.0, 5.0]);
        assert_eq!(features[1].vx, 10.0);
        assert_eq!(features[1].ax, 10.0);

        let features = calculate_features(&[1.0, 0.0], &[1.0, 0.0], &[5.0, 5.0]);
        assert_eq!(features[1].vx, -10.0);
        assert_eq!(features[1].ay, -10.0);
    }

    #[test]
    fn streaming_matches_non_streaming() {
        let xs = [0.0, 0.05, 0.2, 0.21, 0.5, 0.9];
        let ys = [0.1, 0.12, 0.3, 0.31, 0.2, 0.05];
        let ts = [0.0, 8.0, 24.0, 25.0, 60.0, 90.0];

        let direct = calculate_features(&xs, &ys, &ts);
        let mut buffer = Vec::new();
        calculate_features_into(&xs, &ys, &ts, &mut buffer);
        assert_eq!(direct, buffer);

        // reused buffer is cleared between calls
        calculate_features_into(&xs[..3], &ys[..3], &ts[..3], &mut buffer);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer, direct[..3].to_vec());
    }

    #[test]
    fn reused_buffer_does_not_reallocate() {
        let xs = [0.0, 0.1, 0.2, 0.3];
        let ys = [0.0, 0.1, 0.2, 0.3];
        let ts = [0.0, 10.0, 20.0, 30.0];

        let mut buffer = Vec::with_capacity(16);
        let capacity = buffer.capacity();
        let pointer = buffer.as_ptr();
        for _ in 0..100 {
            calculate_features_into(&xs, &ys, &ts, &mut buffer);
        }
        assert_eq!(buffer.capacity(), capacity);
        assert_eq!(buffer.as_ptr(), pointer);
    }

    #[test]
    fn timestampless_fallback_uses_1ms_steps() {
        let xs = [0.0, 0.002, 0.004];
        let ys = [0.0, 0.0, 0.0];
        let fallback = calculate_features_without_timestamps(&xs, &ys);
        let explicit = calculate_features(&xs, &ys, &[0.0, 1.0, 2.0]);
        assert_eq!(fallback, explicit);
        assert!((fallback[1].vx - 0.002).abs() < EPS);
    }

    #[test]
    fn pad_or_truncate_produces_exact_length() {
        let features = calculate_features(
            &[0.0, 0.1, 0.2],
            &[0.0, 0.1, 0.2],
            &[0.0, 10.0, 20.0],
        );

        let (padded, valid) = pad_or_truncate(&features, 5);
        assert_eq!(padded.len(), 5);
        assert_eq!(valid, 3);
        assert_eq!(padded[..3], features[..]);
        assert_eq!(padded[3], FeaturePoint::default());
        assert_eq!(padded[4], FeaturePoint::default());

        let (truncated, valid) = pad_or_truncate(&features, 2);
        assert_eq!(truncated.len(), 2);
        assert_eq!(valid, 2);
        assert_eq!(truncated[..], features[..2]);

        let (empty, valid) = pad_or_truncate(&[], 4);
        assert_eq!(empty.len(), 4);
        assert_eq!(valid, 0);
    }

    #[test]
    fn mismatched_lengths_yield_empty() {
        assert!(calculate_features(&[0.0, 0.1], &[0.0], &[0.0, 1.0]).is_empty());
    }

    #[test]
    fn array_layout_matches_tensor_row() {
        let point = FeaturePoint {
            x: 0.1,
            y: 0.2,
            vx: 0.3,
            vy: 0.4,
            ax: 0.5,
            ay: 0.6,
        };
        let row = point.to_array();
        assert_eq!(row.len(), FEATURE_DIMENSIONS);
        assert_eq!(row, [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }
}
