//! Contact-sheet compositing.
//!
//! Lays a collected strip out as a single image, left to right and then top
//! to bottom, so a whole preview set can be saved or displayed at once.

use image::{DynamicImage, GenericImage, imageops::FilterType};

use crate::error::FilmstripError;

/// Composite `frames` into a sheet `columns` wide.
///
/// The first frame's size is the cell size; frames with another size (for
/// example after an orientation change mid-file) are resized to fit the
/// cell. The sheet has as many rows as needed.
///
/// # Errors
///
/// Returns [`FilmstripError::InvalidOptions`] when `frames` is empty or
/// `columns` is zero.
///
/// # Example
///
/// ```no_run
/// use filmstrip::{CollectOptions, FfmpegFrameDecoder, FilmstripError, FrameCollector};
///
/// # async fn example() -> Result<(), FilmstripError> {
/// let collector = FrameCollector::new(FfmpegFrameDecoder::new("input.mp4"));
/// let frames = collector.generate(None, &CollectOptions::new()).await?;
/// let sheet = filmstrip::compose_strip(&frames, 10)?;
/// sheet.save("sheet.png")?;
/// # Ok(())
/// # }
/// ```
pub fn compose_strip(
    frames: &[DynamicImage],
    columns: u32,
) -> Result<DynamicImage, FilmstripError> {
    if columns == 0 {
        return Err(FilmstripError::InvalidOptions(
            "a strip needs at least one column".to_string(),
        ));
    }
    let first = frames.first().ok_or_else(|| {
        FilmstripError::InvalidOptions("cannot compose an empty strip".to_string())
    })?;

    let (cell_width, cell_height) = (first.width(), first.height());
    let count = frames.len() as u32;
    let used_columns = columns.min(count);
    let rows = count.div_ceil(columns);

    log::debug!(
        "Composing {count} frames into {used_columns}x{rows} sheet \
         ({cell_width}x{cell_height} cells)"
    );

    let mut sheet = DynamicImage::new_rgb8(cell_width * used_columns, cell_height * rows);
    for (index, frame) in frames.iter().enumerate() {
        let column = (index as u32) % columns;
        let row = (index as u32) / columns;

        let x = column * cell_width;
        let y = row * cell_height;
        if frame.width() == cell_width && frame.height() == cell_height {
            sheet.copy_from(frame, x, y)?;
        } else {
            let resized = frame.resize_exact(cell_width, cell_height, FilterType::Triangle);
            sheet.copy_from(&resized, x, y)?;
        }
    }

    Ok(sheet)
}
