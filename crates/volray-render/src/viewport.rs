//! The scene side of a render call: a device to draw with and a camera.

use crate::camera::{Camera, CameraView};
use crate::device::GraphicsDevice;

/// A renderer the volume mapper draws into.
pub trait SceneRenderer {
    type Device: GraphicsDevice;
    type Camera: CameraView;

    /// Device owning the render target.
    fn device_mut(&mut self) -> &mut Self::Device;

    /// Width over height of the render target.
    fn aspect(&self) -> f64;

    fn active_camera(&self) -> &Self::Camera;
}

/// A device paired with a camera and a target size.
#[derive(Debug)]
pub struct Viewport<D> {
    device: D,
    pub camera: Camera,
    width: u32,
    height: u32,
}

impl<D: GraphicsDevice> Viewport<D> {
    pub fn new(device: D, width: u32, height: u32) -> Self {
        Self {
            device,
            camera: Camera::new(),
            width,
            height,
        }
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Changes the size used for the aspect ratio.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Gives the device back.
    pub fn into_device(self) -> D {
        self.device
    }
}

impl<D: GraphicsDevice> SceneRenderer for Viewport<D> {
    type Device = D;
    type Camera = Camera;

    fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn aspect(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }

    fn active_camera(&self) -> &Camera {
        &self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;

    #[test]
    fn test_aspect_of_empty_target() {
        let viewport = Viewport::new(RecordingDevice::new(), 200, 0);
        assert_eq!(viewport.aspect(), 1.0);
        let viewport = Viewport::new(RecordingDevice::new(), 200, 100);
        assert_eq!(viewport.aspect(), 2.0);
    }
}
