//! Regular 3D image data: the field a volume mapper renders.

use glam::DVec3;

use crate::data_array::DataArray;
use crate::error::{Result, VolrayError};
use crate::timestamp::TimeStamp;

/// A collection of data arrays with an optional active-scalars designation.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    arrays: Vec<DataArray>,
    active_scalars: Option<usize>,
}

impl AttributeSet {
    /// Adds an array and returns its index. An array with the same name is
    /// replaced in place.
    pub fn add_array(&mut self, array: DataArray) -> usize {
        if let Some(index) = self.arrays.iter().position(|a| a.name() == array.name()) {
            self.arrays[index] = array;
            index
        } else {
            self.arrays.push(array);
            self.arrays.len() - 1
        }
    }

    /// Adds an array and marks it as the active scalars.
    pub fn set_scalars(&mut self, array: DataArray) -> usize {
        let index = self.add_array(array);
        self.active_scalars = Some(index);
        index
    }

    /// Returns the active scalars, if any.
    #[must_use]
    pub fn scalars(&self) -> Option<&DataArray> {
        self.active_scalars.and_then(|i| self.arrays.get(i))
    }

    /// Returns the array at `index`.
    #[must_use]
    pub fn array(&self, index: usize) -> Option<&DataArray> {
        self.arrays.get(index)
    }

    /// Returns the array called `name`.
    #[must_use]
    pub fn array_by_name(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name() == name)
    }

    /// Returns the number of arrays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns true if no arrays are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Removes every array.
    pub fn clear(&mut self) {
        self.arrays.clear();
        self.active_scalars = None;
    }
}

/// A regular grid of samples with extent, spacing and origin.
///
/// The extent holds inclusive point index bounds
/// `[x_lo, x_hi, y_lo, y_hi, z_lo, z_hi]`. The whole extent is the extent of
/// the complete dataset this image is a piece of; for a stand-alone image the
/// two are equal.
#[derive(Debug, Clone)]
pub struct ImageData {
    extent: [i32; 6],
    whole_extent: [i32; 6],
    spacing: DVec3,
    origin: DVec3,
    point_data: AttributeSet,
    cell_data: AttributeSet,
    field_data: AttributeSet,
    mtime: TimeStamp,
}

impl ImageData {
    /// Creates an image with the given point dimensions, unit spacing and
    /// zero origin.
    #[must_use]
    pub fn new(dimensions: [u32; 3]) -> Self {
        let hi = |d: u32| i32::try_from(d).unwrap_or(i32::MAX).max(1) - 1;
        let extent = [0, hi(dimensions[0]), 0, hi(dimensions[1]), 0, hi(dimensions[2])];
        Self {
            extent,
            whole_extent: extent,
            spacing: DVec3::ONE,
            origin: DVec3::ZERO,
            point_data: AttributeSet::default(),
            cell_data: AttributeSet::default(),
            field_data: AttributeSet::default(),
            mtime: TimeStamp::now(),
        }
    }

    /// Creates an image covering `extent`. The whole extent is set to the
    /// same value.
    ///
    /// # Errors
    /// Fails if any axis has its upper index below its lower index.
    pub fn with_extent(extent: [i32; 6]) -> Result<Self> {
        validate_extent(extent)?;
        let mut image = Self::new([1, 1, 1]);
        image.extent = extent;
        image.whole_extent = extent;
        Ok(image)
    }

    /// Returns the point extent.
    #[must_use]
    pub fn extent(&self) -> [i32; 6] {
        self.extent
    }

    /// Sets the point extent. The whole extent grows to contain it.
    ///
    /// # Errors
    /// Fails if any axis has its upper index below its lower index.
    pub fn set_extent(&mut self, extent: [i32; 6]) -> Result<()> {
        validate_extent(extent)?;
        self.extent = extent;
        for axis in 0..3 {
            self.whole_extent[2 * axis] = self.whole_extent[2 * axis].min(extent[2 * axis]);
            self.whole_extent[2 * axis + 1] =
                self.whole_extent[2 * axis + 1].max(extent[2 * axis + 1]);
        }
        self.modified();
        Ok(())
    }

    /// Returns the whole extent.
    #[must_use]
    pub fn whole_extent(&self) -> [i32; 6] {
        self.whole_extent
    }

    /// Sets the whole extent of the dataset this image belongs to.
    ///
    /// # Errors
    /// Fails if the whole extent is malformed or does not contain the extent.
    pub fn set_whole_extent(&mut self, whole_extent: [i32; 6]) -> Result<()> {
        validate_extent(whole_extent)?;
        let contains = (0..3).all(|axis| {
            whole_extent[2 * axis] <= self.extent[2 * axis]
                && whole_extent[2 * axis + 1] >= self.extent[2 * axis + 1]
        });
        if !contains {
            return Err(VolrayError::InvalidExtent(whole_extent));
        }
        self.whole_extent = whole_extent;
        self.modified();
        Ok(())
    }

    /// Returns the cell extent: one less than the point extent at the high
    /// end of each axis, never below the low end.
    #[must_use]
    pub fn cell_extent(&self) -> [i32; 6] {
        cell_extent_of(self.extent)
    }

    /// Returns the whole cell extent.
    #[must_use]
    pub fn whole_cell_extent(&self) -> [i32; 6] {
        cell_extent_of(self.whole_extent)
    }

    /// Returns point counts per axis.
    #[must_use]
    pub fn dimensions(&self) -> [u32; 3] {
        span_of(self.extent)
    }

    /// Returns cell counts per axis.
    #[must_use]
    pub fn cell_dimensions(&self) -> [u32; 3] {
        span_of(self.cell_extent())
    }

    /// Returns the number of points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.dimensions().iter().map(|&d| d as usize).product()
    }

    /// Returns the number of cells.
    #[must_use]
    pub fn num_cells(&self) -> usize {
        self.cell_dimensions().iter().map(|&d| d as usize).product()
    }

    /// Returns the spacing between samples.
    #[must_use]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    /// Sets the sample spacing. Negative components flip the axis.
    pub fn set_spacing(&mut self, spacing: DVec3) {
        self.spacing = spacing;
        self.modified();
    }

    /// Returns the world position of point index zero.
    #[must_use]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Sets the origin.
    pub fn set_origin(&mut self, origin: DVec3) {
        self.origin = origin;
        self.modified();
    }

    /// Attaches point scalars and makes them active.
    ///
    /// # Errors
    /// Fails if the tuple count differs from the number of points.
    pub fn set_point_scalars(&mut self, array: DataArray) -> Result<()> {
        check_tuples(&array, self.num_points())?;
        self.point_data.set_scalars(array);
        self.modified();
        Ok(())
    }

    /// Attaches cell scalars and makes them active.
    ///
    /// # Errors
    /// Fails if the tuple count differs from the number of cells.
    pub fn set_cell_scalars(&mut self, array: DataArray) -> Result<()> {
        check_tuples(&array, self.num_cells())?;
        self.cell_data.set_scalars(array);
        self.modified();
        Ok(())
    }

    /// Returns the point attributes.
    #[must_use]
    pub fn point_data(&self) -> &AttributeSet {
        &self.point_data
    }

    /// Returns the point attributes for modification and marks the image
    /// modified.
    pub fn point_data_mut(&mut self) -> &mut AttributeSet {
        self.modified();
        &mut self.point_data
    }

    /// Returns the cell attributes.
    #[must_use]
    pub fn cell_data(&self) -> &AttributeSet {
        &self.cell_data
    }

    /// Returns the cell attributes for modification and marks the image
    /// modified.
    pub fn cell_data_mut(&mut self) -> &mut AttributeSet {
        self.modified();
        &mut self.cell_data
    }

    /// Returns the field (non-geometric) attributes.
    #[must_use]
    pub fn field_data(&self) -> &AttributeSet {
        &self.field_data
    }

    /// Returns the field attributes for modification and marks the image
    /// modified.
    pub fn field_data_mut(&mut self) -> &mut AttributeSet {
        self.modified();
        &mut self.field_data
    }

    /// Returns the last modification stamp.
    #[must_use]
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }

    /// Marks the image as modified.
    pub fn modified(&mut self) {
        self.mtime.modified();
    }
}

fn validate_extent(extent: [i32; 6]) -> Result<()> {
    if (0..3).any(|axis| extent[2 * axis + 1] < extent[2 * axis]) {
        return Err(VolrayError::InvalidExtent(extent));
    }
    Ok(())
}

fn cell_extent_of(extent: [i32; 6]) -> [i32; 6] {
    let mut cells = extent;
    for axis in 0..3 {
        cells[2 * axis + 1] = (extent[2 * axis + 1] - 1).max(extent[2 * axis]);
    }
    cells
}

#[allow(clippy::cast_sign_loss)]
fn span_of(extent: [i32; 6]) -> [u32; 3] {
    [0, 1, 2].map(|axis| (extent[2 * axis + 1] - extent[2 * axis] + 1).max(0) as u32)
}

fn check_tuples(array: &DataArray, expected: usize) -> Result<()> {
    if array.tuples() == expected {
        Ok(())
    } else {
        Err(VolrayError::SizeMismatch {
            expected,
            actual: array.tuples(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_array::ScalarBuffer;

    #[test]
    fn test_new_image_geometry() {
        let image = ImageData::new([4, 3, 2]);
        assert_eq!(image.extent(), [0, 3, 0, 2, 0, 1]);
        assert_eq!(image.whole_extent(), image.extent());
        assert_eq!(image.num_points(), 24);
        assert_eq!(image.cell_extent(), [0, 2, 0, 1, 0, 0]);
        assert_eq!(image.num_cells(), 6);
    }

    #[test]
    fn test_flat_axis_keeps_one_cell_layer() {
        let image = ImageData::new([3, 3, 1]);
        assert_eq!(image.cell_extent(), [0, 1, 0, 1, 0, 0]);
        assert_eq!(image.cell_dimensions(), [2, 2, 1]);
    }

    #[test]
    fn test_mutations_advance_mtime() {
        let mut image = ImageData::new([2, 2, 2]);
        let before = image.mtime();
        image.set_spacing(DVec3::splat(0.5));
        assert!(image.mtime() > before);

        let before = image.mtime();
        image
            .set_point_scalars(DataArray::scalars(
                "s",
                ScalarBuffer::UnsignedChar(vec![0; 8]),
            ))
            .unwrap();
        assert!(image.mtime() > before);
    }

    #[test]
    fn test_scalar_count_must_match_points() {
        let mut image = ImageData::new([2, 2, 2]);
        let err = image
            .set_point_scalars(DataArray::scalars("s", ScalarBuffer::Float(vec![0.0; 7])))
            .unwrap_err();
        assert!(matches!(err, VolrayError::SizeMismatch { expected: 8, actual: 7 }));
        assert!(image
            .set_cell_scalars(DataArray::scalars("c", ScalarBuffer::Float(vec![1.0])))
            .is_ok());
    }

    #[test]
    fn test_whole_extent_must_contain_extent() {
        let mut image = ImageData::with_extent([2, 5, 0, 3, 0, 3]).unwrap();
        assert!(image.set_whole_extent([0, 9, 0, 3, 0, 3]).is_ok());
        assert!(image.set_whole_extent([3, 9, 0, 3, 0, 3]).is_err());
        assert!(ImageData::with_extent([0, -1, 0, 0, 0, 0]).is_err());
    }
}
