//! Scalar array selection on image data.

use serde::{Deserialize, Serialize};

use crate::data_array::DataArray;
use crate::image_data::{AttributeSet, ImageData};

/// Where to look for the scalars to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalarMode {
    /// Active point scalars, falling back to active cell scalars.
    #[default]
    Default,
    /// Active point scalars only.
    UsePointData,
    /// Active cell scalars only.
    UseCellData,
    /// A named or indexed array of the point data.
    UsePointFieldData,
    /// A named or indexed array of the cell data.
    UseCellFieldData,
    /// A named or indexed array of the field data.
    UseFieldData,
}

/// How an array is looked up in the field-data modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayAccess {
    ById(usize),
    ByName(String),
}

impl Default for ArrayAccess {
    fn default() -> Self {
        Self::ById(0)
    }
}

/// The attribute set a selected array came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOrigin {
    Point,
    Cell,
    Field,
}

impl ScalarOrigin {
    /// Returns true if samples live at cell centers.
    #[must_use]
    pub fn is_cell(self) -> bool {
        self == ScalarOrigin::Cell
    }
}

fn lookup<'a>(set: &'a AttributeSet, access: &ArrayAccess) -> Option<&'a DataArray> {
    match access {
        ArrayAccess::ById(id) => set.array(*id),
        ArrayAccess::ByName(name) => set.array_by_name(name),
    }
}

/// Selects the scalars of `image` according to `mode` and `access`.
///
/// `access` is only consulted by the field-data modes.
#[must_use]
pub fn select_scalars<'a>(
    image: &'a ImageData,
    mode: ScalarMode,
    access: &ArrayAccess,
) -> Option<(&'a DataArray, ScalarOrigin)> {
    match mode {
        ScalarMode::Default => image
            .point_data()
            .scalars()
            .map(|a| (a, ScalarOrigin::Point))
            .or_else(|| image.cell_data().scalars().map(|a| (a, ScalarOrigin::Cell))),
        ScalarMode::UsePointData => image.point_data().scalars().map(|a| (a, ScalarOrigin::Point)),
        ScalarMode::UseCellData => image.cell_data().scalars().map(|a| (a, ScalarOrigin::Cell)),
        ScalarMode::UsePointFieldData => {
            lookup(image.point_data(), access).map(|a| (a, ScalarOrigin::Point))
        }
        ScalarMode::UseCellFieldData => {
            lookup(image.cell_data(), access).map(|a| (a, ScalarOrigin::Cell))
        }
        ScalarMode::UseFieldData => {
            lookup(image.field_data(), access).map(|a| (a, ScalarOrigin::Field))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_array::ScalarBuffer;

    fn image() -> ImageData {
        let mut image = ImageData::new([2, 2, 2]);
        image
            .set_cell_scalars(DataArray::scalars("cells", ScalarBuffer::Float(vec![3.0])))
            .unwrap();
        image
            .point_data_mut()
            .add_array(DataArray::scalars("extra", ScalarBuffer::Short(vec![0; 8])));
        image
            .field_data_mut()
            .add_array(DataArray::scalars("meta", ScalarBuffer::Double(vec![1.0])));
        image
    }

    #[test]
    fn test_default_falls_back_to_cells() {
        let image = image();
        let (array, origin) = select_scalars(&image, ScalarMode::Default, &ArrayAccess::default())
            .unwrap();
        assert_eq!(array.name(), "cells");
        assert_eq!(origin, ScalarOrigin::Cell);
        assert!(select_scalars(&image, ScalarMode::UsePointData, &ArrayAccess::default()).is_none());
    }

    #[test]
    fn test_field_modes_use_access() {
        let image = image();
        let (array, origin) = select_scalars(
            &image,
            ScalarMode::UsePointFieldData,
            &ArrayAccess::ByName("extra".into()),
        )
        .unwrap();
        assert_eq!(array.name(), "extra");
        assert_eq!(origin, ScalarOrigin::Point);

        let (_, origin) =
            select_scalars(&image, ScalarMode::UseFieldData, &ArrayAccess::ById(0)).unwrap();
        assert_eq!(origin, ScalarOrigin::Field);
        assert!(select_scalars(&image, ScalarMode::UseFieldData, &ArrayAccess::ById(1)).is_none());
    }
}
