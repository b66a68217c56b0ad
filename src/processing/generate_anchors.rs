// Base anchors in the inclusive pixel convention: a box (x1, y1, x2, y2) spans
// x2 - x1 + 1 pixels.

use ndarray::{array, concatenate, Array1, Array2, Axis};

fn whctrs(anchor: &Array1<f32>) -> (f32, f32, f32, f32) {
    let w = anchor[2] - anchor[0] + 1.0;
    let h = anchor[3] - anchor[1] + 1.0;
    let x_ctr = anchor[0] + 0.5 * (w - 1.0);
    let y_ctr = anchor[1] + 0.5 * (h - 1.0);
    (w, h, x_ctr, y_ctr)
}

fn mkanchors(ws: &Array1<f32>, hs: &Array1<f32>, x_ctr: f32, y_ctr: f32) -> Array2<f32> {
    Array2::from_shape_fn((ws.len(), 4), |(i, j)| match j {
        0 => x_ctr - 0.5 * (ws[i] - 1.0),
        1 => y_ctr - 0.5 * (hs[i] - 1.0),
        2 => x_ctr + 0.5 * (ws[i] - 1.0),
        _ => y_ctr + 0.5 * (hs[i] - 1.0),
    })
}

fn ratio_enum(anchor: &Array1<f32>, ratios: &Array1<f32>) -> Array2<f32> {
    let (w, h, x_ctr, y_ctr) = whctrs(anchor);
    let size = w * h;
    let ws = ratios.mapv(|ratio| (size / ratio).sqrt().round());
    let hs = (&ws * ratios).mapv(f32::round);
    mkanchors(&ws, &hs, x_ctr, y_ctr)
}

fn scale_enum(anchor: &Array1<f32>, scales: &Array1<f32>) -> Array2<f32> {
    let (w, h, x_ctr, y_ctr) = whctrs(anchor);
    let ws = scales.mapv(|scale| w * scale);
    let hs = scales.mapv(|scale| h * scale);
    mkanchors(&ws, &hs, x_ctr, y_ctr)
}

/// Enumerates base anchors over aspect ratios (outer) and scales (inner) around the
/// `base_size x base_size` reference box anchored at the origin.
pub fn generate_anchors(base_size: u32, ratios: &[f32], scales: &[f32]) -> Array2<f32> {
    let base_anchor = array![0.0, 0.0, base_size as f32 - 1.0, base_size as f32 - 1.0];
    let ratio_anchors = ratio_enum(&base_anchor, &Array1::from(ratios.to_vec()));
    let scales = Array1::from(scales.to_vec());

    let per_ratio: Vec<Array2<f32>> = ratio_anchors
        .axis_iter(Axis(0))
        .map(|anchor| scale_enum(&anchor.to_owned(), &scales))
        .collect();
    let views: Vec<_> = per_ratio.iter().map(|a| a.view()).collect();

    if views.is_empty() {
        return Array2::zeros((0, 4));
    }
    concatenate(Axis(0), &views).unwrap_or_else(|_| Array2::zeros((0, 4)))
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};
    use crate::processing::generate_anchors::generate_anchors;

    #[test]
    fn test_generate_anchors() {
        let anchors = generate_anchors(16, &[0.5, 1.0, 2.0], &[8.0, 16.0, 32.0]);

        let expected: Array2<f32> = array![
            [-84.0, -40.0, 99.0, 55.0],
            [-176.0, -88.0, 191.0, 103.0],
            [-360.0, -184.0, 375.0, 199.0],
            [-56.0, -56.0, 71.0, 71.0],
            [-120.0, -120.0, 135.0, 135.0],
            [-248.0, -248.0, 263.0, 263.0],
            [-36.0, -80.0, 51.0, 95.0],
            [-80.0, -168.0, 95.0, 183.0],
            [-168.0, -344.0, 183.0, 359.0]
        ];
        assert_eq!(anchors, expected);
    }

    #[test]
    fn test_generate_anchors_single_ratio() {
        let anchors = generate_anchors(16, &[1.0], &[1.0, 2.0]);

        let expected: Array2<f32> = array![[0.0, 0.0, 15.0, 15.0], [-8.0, -8.0, 23.0, 23.0]];
        assert_eq!(anchors, expected);
    }

    #[test]
    fn test_generate_anchors_empty() {
        assert_eq!(generate_anchors(16, &[], &[8.0]).nrows(), 0);
        assert_eq!(generate_anchors(16, &[1.0], &[]).nrows(), 0);
    }
}
