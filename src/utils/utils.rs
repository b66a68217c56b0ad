use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray_npy::write_npy;
use tracing::debug;

use crate::pipeline::anchor_target::output::AnchorTargetOutput;

/// Writes the four RPN blobs as `.npy` files into `dir`, creating it if needed.
pub fn write_npy_outputs(output: &AnchorTargetOutput, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    for (name, blob) in [
        ("rpn_labels.npy", &output.labels),
        ("rpn_bbox_targets.npy", &output.bbox_targets),
        ("rpn_bbox_inside_weights.npy", &output.bbox_inside_weights),
        ("rpn_bbox_outside_weights.npy", &output.bbox_outside_weights),
    ] {
        let path = dir.join(name);
        write_npy(&path, blob).with_context(|| format!("failed to write {}", path.display()))?;
    }

    debug!(dir = %dir.display(), "dumped anchor target blobs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;
    use ndarray_npy::read_npy;
    use crate::pipeline::anchor_target::output::AnchorTargetOutput;
    use crate::utils::utils::write_npy_outputs;

    #[test]
    fn test_write_npy_outputs() {
        let dir = std::env::temp_dir()
            .join(format!("rpn-anchor-target-npy-{}", std::process::id()));
        let mut output = AnchorTargetOutput::new(2, 3, 4);
        output.bbox_targets[[0, 5, 1, 2]] = 0.25;

        write_npy_outputs(&output, &dir).unwrap();

        let labels: Array4<f32> = read_npy(dir.join("rpn_labels.npy")).unwrap();
        let targets: Array4<f32> = read_npy(dir.join("rpn_bbox_targets.npy")).unwrap();
        assert_eq!(labels, output.labels);
        assert_eq!(targets, output.bbox_targets);
        assert!(dir.join("rpn_bbox_outside_weights.npy").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
