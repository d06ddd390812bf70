//! Scoped fixed-function state.

use std::ops::{Deref, DerefMut};

use crate::device::{BlendState, GraphicsDevice, PipelineState};

/// State the ray-casting draw runs with: "over" blending and depth testing
/// against whatever opaque geometry is already in the target.
pub const RAYCAST_STATE: PipelineState = PipelineState {
    blend: BlendState::Over,
    depth_test: true,
};

/// Applies a pipeline state to a device and puts the previous state back
/// when dropped, on every exit path.
pub struct StateScope<'a, D: GraphicsDevice> {
    device: &'a mut D,
    previous: PipelineState,
}

impl<'a, D: GraphicsDevice> StateScope<'a, D> {
    pub fn new(device: &'a mut D, state: PipelineState) -> Self {
        let previous = device.pipeline_state();
        device.set_pipeline_state(state);
        Self { device, previous }
    }

    /// The state that will be restored.
    #[must_use]
    pub fn previous(&self) -> PipelineState {
        self.previous
    }
}

impl<D: GraphicsDevice> Deref for StateScope<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: GraphicsDevice> DerefMut for StateScope<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: GraphicsDevice> Drop for StateScope<'_, D> {
    fn drop(&mut self) {
        self.device.set_pipeline_state(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use crate::error::{RenderError, RenderResult};

    #[test]
    fn test_state_restored_on_drop() {
        let mut device = RecordingDevice::new();
        {
            let scope = StateScope::new(&mut device, RAYCAST_STATE);
            assert_eq!(scope.pipeline_state(), RAYCAST_STATE);
            assert_eq!(scope.previous(), PipelineState::default());
        }
        assert_eq!(device.pipeline_state(), PipelineState::default());
    }

    #[test]
    fn test_state_restored_on_early_return() {
        fn failing(device: &mut RecordingDevice) -> RenderResult<()> {
            let _scope = StateScope::new(device, RAYCAST_STATE);
            Err(RenderError::OutOfMemory)
        }

        let mut device = RecordingDevice::new();
        let custom = PipelineState {
            blend: BlendState::Off,
            depth_test: true,
        };
        device.set_pipeline_state(custom);
        assert!(failing(&mut device).is_err());
        assert_eq!(device.pipeline_state(), custom);
    }
}
