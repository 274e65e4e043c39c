//! Guide offsets to row intervals.

use crate::domain::model::Region;
use crate::utils::error::{Result, SlicerError};
use std::collections::BTreeSet;

pub const DEFAULT_MAX_REGIONS: usize = 100;

pub fn default_region_name(index: usize) -> String {
    format!("slice-{:03}", index + 1)
}

fn round_offset(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some(value.round() as i64)
    } else {
        None
    }
}

/// Rounded frame height, if it is positive and fits a pixel row index.
fn frame_extent(frame_height: f64) -> Option<u32> {
    round_offset(frame_height)
        .and_then(|h| u32::try_from(h).ok())
        .filter(|h| *h > 0)
}

/// Splits `[0, round(frame_height)]` at every interior guide.
///
/// Offsets are rounded, anything at or outside the frame edges is dropped and
/// duplicates collapse. Returns an empty list when no guide survives or the
/// height does not fit in `u32`.
pub fn compute_regions<I>(frame_height: f64, offsets: I) -> Vec<Region>
where
    I: IntoIterator<Item = f64>,
{
    let Some(height) = frame_extent(frame_height) else {
        return Vec::new();
    };

    let cuts: BTreeSet<u32> = offsets
        .into_iter()
        .filter_map(round_offset)
        .filter_map(|y| u32::try_from(y).ok())
        .filter(|&y| y > 0 && y < height)
        .collect();

    if cuts.is_empty() {
        return Vec::new();
    }

    let mut boundaries = Vec::with_capacity(cuts.len() + 2);
    boundaries.push(0);
    boundaries.extend(cuts);
    boundaries.push(height);

    boundaries
        .windows(2)
        .filter(|pair| pair[1] > pair[0])
        .enumerate()
        .map(|(index, pair)| Region {
            index,
            y0: pair[0],
            y1: pair[1],
            default_name: default_region_name(index),
        })
        .collect()
}

/// Like [`compute_regions`] but refuses empty and oversized results.
pub fn plan_regions<I>(frame_height: f64, offsets: I, max_regions: usize) -> Result<Vec<Region>>
where
    I: IntoIterator<Item = f64>,
{
    if round_offset(frame_height).is_some_and(|h| h > i64::from(u32::MAX)) {
        return Err(SlicerError::scene(format!(
            "Frame height {} is too large to slice",
            frame_height
        )));
    }

    let regions = compute_regions(frame_height, offsets);
    if regions.is_empty() {
        return Err(SlicerError::NoGuides);
    }
    if regions.len() > max_regions {
        return Err(SlicerError::TooManyRegions {
            count: regions.len(),
            max: max_regions,
        });
    }

    tracing::debug!(
        "Planned {} regions for frame height {}",
        regions.len(),
        frame_height
    );
    Ok(regions)
}
