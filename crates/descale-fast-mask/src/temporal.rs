use descale_fast_ops::{average_planes, binarize, max_planes, min_planes};
use descale_fast_types::{FrameError, FrameResult, Plane};

/// Suppresses single-frame flicker in a binary mask sequence.
///
/// `window` holds the masks of frames `n - 2r ..= n + 2r` (edges already
/// clamped by the caller), so its length must be `4r + 1`. A pixel survives
/// only when some frame in `n - r ..= n + r` has it on and its own
/// neighbourhood average is at least `neutral`. The result never turns on a
/// pixel that is off in frame `n`.
pub fn stabilize(window: &[Plane], radius: usize, neutral: f32, peak: f32) -> FrameResult<Plane> {
    if window.len() != 4 * radius + 1 {
        return Err(FrameError::configuration(format!(
            "temporal window of radius {radius} needs {} masks, got {}",
            4 * radius + 1,
            window.len()
        )));
    }
    let centre = 2 * radius;

    let corroborated = (radius..=3 * radius)
        .map(|m| {
            let neighbours: Vec<&Plane> = window[m - radius..=m + radius].iter().collect();
            let average = average_planes(&neighbours)?;
            let vote = binarize(&average, neutral, 0.0, peak)?;
            min_planes(&[&window[m], &vote])
        })
        .collect::<FrameResult<Vec<_>>>()?;

    let refs: Vec<&Plane> = corroborated.iter().collect();
    let spread = max_planes(&refs)?;
    min_planes(&[&window[centre], &spread])
}
