//! Volume texture loading with dirty tracking.

use volray_core::{DataArray, ImageData, ScalarOrigin, TimeStamp};

use crate::device::{FilterMode, GraphicsDevice, TextureDesc, TextureDimension, WrapMode};
use crate::error::{RenderError, RenderResult};
use crate::format::{encode_texels, ResolvedFormat};

/// GPU mirror of the scalar field.
///
/// The texture is rebuilt only when the image was modified after the last
/// upload, when a different array is selected, or when the sampling filter
/// changed.
#[derive(Debug)]
pub struct VolumeTexture<T> {
    texture: Option<T>,
    format: Option<ResolvedFormat>,
    source: Option<(ScalarOrigin, String)>,
    size: [u32; 3],
    filter: FilterMode,
    build_time: TimeStamp,
    uploads: usize,
}

impl<T> Default for VolumeTexture<T> {
    fn default() -> Self {
        Self {
            texture: None,
            format: None,
            source: None,
            size: [0; 3],
            filter: FilterMode::Nearest,
            build_time: TimeStamp::NEVER,
            uploads: 0,
        }
    }
}

impl<T> VolumeTexture<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an upload is needed for `scalars` selected from
    /// `origin` of a field stamped `field_mtime`.
    #[must_use]
    pub fn is_dirty(
        &self,
        field_mtime: TimeStamp,
        scalars: &DataArray,
        origin: ScalarOrigin,
        filter: FilterMode,
    ) -> bool {
        let same_source = self
            .source
            .as_ref()
            .is_some_and(|(o, name)| *o == origin && name == scalars.name());
        self.texture.is_none()
            || !same_source
            || field_mtime > self.build_time
            || filter != self.filter
    }

    /// Uploads the field if it is dirty. Returns true if an upload happened.
    ///
    /// On failure the previously uploaded texture is kept and the build time
    /// is left untouched.
    pub fn update<D>(
        &mut self,
        device: &mut D,
        image: &ImageData,
        scalars: &DataArray,
        origin: ScalarOrigin,
        format: &ResolvedFormat,
        filter: FilterMode,
    ) -> RenderResult<bool>
    where
        D: GraphicsDevice<Texture = T>,
    {
        if !self.is_dirty(image.mtime(), scalars, origin, filter) {
            return Ok(false);
        }

        let size = texture_size(image, origin);
        let texels: usize = size.iter().map(|&s| s as usize).product();
        if scalars.tuples() != texels {
            return Err(RenderError::TextureCreationFailed(format!(
                "scalar array '{}' has {} tuples, volume needs {}",
                scalars.name(),
                scalars.tuples(),
                texels
            )));
        }
        let max = device.capabilities().max_texture_dimension_3d;
        if size.iter().any(|&s| s > max) {
            return Err(RenderError::TextureCreationFailed(format!(
                "volume {}x{}x{} exceeds the 3D texture limit of {max}",
                size[0], size[1], size[2]
            )));
        }

        let data = encode_texels(scalars, format)?;
        let desc = TextureDesc {
            label: "volume texture",
            dimension: TextureDimension::D3,
            size,
            format: format.internal,
            filter,
            wrap: WrapMode::ClampToEdge,
        };
        let texture = device.create_texture(&desc, &data)?;

        self.texture = Some(texture);
        self.format = Some(*format);
        self.source = Some((origin, scalars.name().to_owned()));
        self.size = size;
        self.filter = filter;
        self.build_time = TimeStamp::now();
        self.uploads += 1;
        log::debug!(
            "uploaded volume texture {}x{}x{} as {:?}",
            size[0],
            size[1],
            size[2],
            format.internal
        );
        Ok(true)
    }

    /// Returns the uploaded texture.
    #[must_use]
    pub fn texture(&self) -> Option<&T> {
        self.texture.as_ref()
    }

    /// Returns the format of the uploaded texture.
    #[must_use]
    pub fn format(&self) -> Option<&ResolvedFormat> {
        self.format.as_ref()
    }

    #[must_use]
    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Returns the time of the last successful upload.
    #[must_use]
    pub fn build_time(&self) -> TimeStamp {
        self.build_time
    }

    /// Returns the number of uploads performed so far.
    #[must_use]
    pub fn uploads(&self) -> usize {
        self.uploads
    }
}

/// Texel counts per axis: one texel per point, or per cell for cell data.
#[must_use]
pub fn texture_size(image: &ImageData, origin: ScalarOrigin) -> [u32; 3] {
    if origin.is_cell() {
        image.cell_dimensions()
    } else {
        image.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, DeviceCapabilities, RecordingDevice};
    use crate::format::resolve;
    use volray_core::ScalarBuffer;

    fn field() -> ImageData {
        let mut image = ImageData::new([2, 2, 2]);
        image
            .set_point_scalars(DataArray::scalars(
                "s",
                ScalarBuffer::UnsignedChar((0..8).collect()),
            ))
            .unwrap();
        image
    }

    fn upload(
        texture: &mut VolumeTexture<u64>,
        device: &mut RecordingDevice,
        image: &ImageData,
    ) -> RenderResult<bool> {
        let scalars = image.point_data().scalars().unwrap().clone();
        let format = resolve(
            scalars.scalar_type(),
            1,
            [0.0, 255.0],
            &DeviceCapabilities::default(),
        )?;
        texture.update(
            device,
            image,
            &scalars,
            ScalarOrigin::Point,
            &format,
            FilterMode::Nearest,
        )
    }

    #[test]
    fn test_second_update_without_modification_is_skipped() {
        let mut device = RecordingDevice::new();
        let mut texture = VolumeTexture::new();
        let mut image = field();

        assert!(upload(&mut texture, &mut device, &image).unwrap());
        let built = texture.build_time();
        assert!(!upload(&mut texture, &mut device, &image).unwrap());
        assert_eq!(texture.build_time(), built);
        assert_eq!(texture.uploads(), 1);
        assert_eq!(device.texture_creations("volume texture"), 1);

        image.modified();
        assert!(upload(&mut texture, &mut device, &image).unwrap());
        assert_eq!(texture.uploads(), 2);
    }

    #[test]
    fn test_failed_upload_keeps_previous_texture() {
        let mut device = RecordingDevice::new();
        let mut texture = VolumeTexture::new();
        let mut image = field();
        upload(&mut texture, &mut device, &image).unwrap();
        let previous = texture.texture().copied();
        let built = texture.build_time();

        device.fail_texture_allocations(true);
        image.modified();
        assert!(upload(&mut texture, &mut device, &image).is_err());
        assert_eq!(texture.texture().copied(), previous);
        assert_eq!(texture.build_time(), built);
        let scalars = image.point_data().scalars().unwrap();
        assert!(texture.is_dirty(
            image.mtime(),
            scalars,
            ScalarOrigin::Point,
            FilterMode::Nearest
        ));
    }

    #[test]
    fn test_other_array_is_dirty() {
        let mut device = RecordingDevice::new();
        let mut texture = VolumeTexture::new();
        let mut image = field();
        image
            .point_data_mut()
            .add_array(DataArray::scalars("t", ScalarBuffer::UnsignedChar(vec![9; 8])));
        upload(&mut texture, &mut device, &image).unwrap();

        let active = image.point_data().scalars().unwrap();
        let other = image.point_data().array_by_name("t").unwrap();
        let filter = FilterMode::Nearest;
        assert!(!texture.is_dirty(image.mtime(), active, ScalarOrigin::Point, filter));
        assert!(texture.is_dirty(image.mtime(), other, ScalarOrigin::Point, filter));
        assert!(texture.is_dirty(image.mtime(), active, ScalarOrigin::Field, filter));
    }

    #[test]
    fn test_texture_matches_extent_span() {
        let mut device = RecordingDevice::new();
        let mut texture = VolumeTexture::new();
        let image = field();
        upload(&mut texture, &mut device, &image).unwrap();
        assert_eq!(texture.size(), [2, 2, 2]);
        assert!(device.calls().iter().any(|c| matches!(
            c,
            DeviceCall::CreateTexture { size: [2, 2, 2], .. }
        )));
    }

    #[test]
    fn test_cell_data_uses_cell_span() {
        let image = ImageData::new([3, 3, 2]);
        assert_eq!(texture_size(&image, ScalarOrigin::Cell), [2, 2, 1]);
        assert_eq!(texture_size(&image, ScalarOrigin::Point), [3, 3, 2]);
    }
}
