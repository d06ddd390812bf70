//! Bounding geometry of the volume.

use volray_core::{ImageData, ScalarOrigin};

use crate::device::{BufferKind, GraphicsDevice};
use crate::error::RenderResult;

/// World-space bounds `[x_min, x_max, y_min, y_max, z_min, z_max]`.
pub type Bounds = [f64; 6];

/// Computes the world bounds of `image`.
///
/// For point data the bounds run through the outermost points. For cell data
/// they run through the outermost cell centers, except on a side where the
/// image reaches the whole extent: there the bounds extend to the cell edge.
/// Axes with negative spacing are swapped so min <= max.
#[must_use]
pub fn compute_bounds(image: &ImageData, origin: ScalarOrigin) -> Bounds {
    let spacing = image.spacing().to_array();
    let world_origin = image.origin().to_array();
    let mut bounds = [0.0; 6];

    let (extent, whole) = if origin.is_cell() {
        (image.cell_extent(), Some(image.whole_cell_extent()))
    } else {
        (image.extent(), None)
    };

    for axis in 0..3 {
        let (o, sp) = (world_origin[axis], spacing[axis]);
        let lo_index = f64::from(extent[2 * axis]);
        let hi_index = f64::from(extent[2 * axis + 1]);
        let (lo, hi) = match whole {
            None => (o + lo_index * sp, o + hi_index * sp),
            Some(whole) => {
                let lo = if extent[2 * axis] == whole[2 * axis] {
                    o + lo_index * sp
                } else {
                    o + (lo_index + 0.5) * sp
                };
                let hi = if extent[2 * axis + 1] == whole[2 * axis + 1] {
                    o + (hi_index + 1.0) * sp
                } else {
                    o + (hi_index + 0.5) * sp
                };
                (lo, hi)
            }
        };
        bounds[2 * axis] = lo.min(hi);
        bounds[2 * axis + 1] = lo.max(hi);
    }
    bounds
}

/// Affine map from normalized box coordinates to texture coordinates.
///
/// Box coordinate 0 is the world minimum of the bounds and 1 the maximum.
/// The texture coordinate is `box * scale + offset`, which puts point samples
/// and interior cell samples on texel centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureMapping {
    pub offset: [f64; 3],
    pub scale: [f64; 3],
}

impl TextureMapping {
    #[must_use]
    pub fn new(image: &ImageData, origin: ScalarOrigin) -> Self {
        let spacing = image.spacing().to_array();
        let (extent, whole) = if origin.is_cell() {
            (image.cell_extent(), Some(image.whole_cell_extent()))
        } else {
            (image.extent(), None)
        };

        let mut offset = [0.0; 3];
        let mut scale = [1.0; 3];
        for axis in 0..3 {
            let texels = f64::from(extent[2 * axis + 1] - extent[2 * axis] + 1);
            let half = 0.5 / texels;
            let (at_lo, at_hi) = match whole {
                None => (half, 1.0 - half),
                Some(whole) => (
                    if extent[2 * axis] == whole[2 * axis] { 0.0 } else { half },
                    if extent[2 * axis + 1] == whole[2 * axis + 1] {
                        1.0
                    } else {
                        1.0 - half
                    },
                ),
            };
            if spacing[axis] < 0.0 {
                offset[axis] = at_hi;
                scale[axis] = at_lo - at_hi;
            } else {
                offset[axis] = at_lo;
                scale[axis] = at_hi - at_lo;
            }
        }
        Self { offset, scale }
    }
}

/// Texture extents as the shader sees them: the index range the texture was
/// built from.
#[must_use]
pub fn texture_extents(image: &ImageData, origin: ScalarOrigin) -> [i32; 6] {
    if origin.is_cell() {
        image.cell_extent()
    } else {
        image.extent()
    }
}

/// Triangles of the bounding cube, wound counter-clockwise seen from outside.
pub const CUBE_INDICES: [u16; 36] = [
    0, 5, 4, 5, 0, 1, 3, 7, 6, 3, 6, 2, 7, 4, 6, 6, 4, 5, 2, 1, 3, 3, 1, 0, 3, 0, 7, 7, 0, 4, 6,
    5, 2, 2, 5, 1,
];

/// The eight cube corners: bottom face (z min) counter-clockwise from the
/// origin corner, then the top face in the same order.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cube_vertices(bounds: &Bounds) -> [[f32; 3]; 8] {
    let [x0, x1, y0, y1, z0, z1] = bounds.map(|b| b as f32);
    [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ]
}

/// Vertex and index buffers of the bounding cube.
#[derive(Debug)]
pub struct CubeGeometry<B> {
    vertices: B,
    indices: B,
}

impl<B> CubeGeometry<B> {
    /// Allocates the buffers with a unit cube.
    pub fn new<D>(device: &mut D) -> RenderResult<Self>
    where
        D: GraphicsDevice<Buffer = B>,
    {
        let unit = cube_vertices(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let vertices =
            device.create_buffer("cube vertices", BufferKind::Vertex, bytemuck::cast_slice(&unit))?;
        let indices = device.create_buffer(
            "cube indices",
            BufferKind::Index,
            bytemuck::cast_slice(&CUBE_INDICES),
        )?;
        Ok(Self { vertices, indices })
    }

    /// Moves the cube corners to `bounds`.
    pub fn rebuild<D>(&self, device: &mut D, bounds: &Bounds)
    where
        D: GraphicsDevice<Buffer = B>,
    {
        let corners = cube_vertices(bounds);
        device.write_buffer(&self.vertices, bytemuck::cast_slice(&corners));
    }

    #[must_use]
    pub fn vertices(&self) -> &B {
        &self.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &B {
        &self.indices
    }

    /// Number of indices in one draw.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        CUBE_INDICES.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec3, Vec3};
    use proptest::prelude::*;

    #[test]
    fn test_point_bounds_unit_cube() {
        let image = ImageData::new([2, 2, 2]);
        assert_eq!(
            compute_bounds(&image, ScalarOrigin::Point),
            [0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_negative_spacing_swaps_axis() {
        let mut image = ImageData::new([3, 2, 2]);
        image.set_origin(DVec3::new(10.0, 0.0, 0.0));
        image.set_spacing(DVec3::new(-2.0, 1.0, 1.0));
        let bounds = compute_bounds(&image, ScalarOrigin::Point);
        assert_eq!(&bounds[..2], &[6.0, 10.0]);
    }

    #[test]
    fn test_cell_bounds_at_whole_boundary_reach_cell_edge() {
        // 4 points per axis, 3 cells; the image is the whole dataset.
        let mut image = ImageData::new([4, 4, 4]);
        image.set_origin(DVec3::new(1.0, 2.0, 3.0));
        image.set_spacing(DVec3::splat(0.5));
        let bounds = compute_bounds(&image, ScalarOrigin::Cell);
        let cell_hi = f64::from(image.cell_extent()[1]);
        assert_eq!(bounds[0], 1.0);
        assert_eq!(bounds[1], 1.0 + (cell_hi + 1.0) * 0.5);
        assert_eq!(bounds[5], 3.0 + (cell_hi + 1.0) * 0.5);
    }

    #[test]
    fn test_cell_bounds_inside_whole_use_half_cell() {
        let mut image = ImageData::with_extent([2, 5, 0, 3, 0, 3]).unwrap();
        image.set_whole_extent([0, 9, 0, 3, 0, 3]).unwrap();
        let bounds = compute_bounds(&image, ScalarOrigin::Cell);
        // Cell extent along x is [2, 4], inside the whole cell extent [0, 8].
        assert_eq!(bounds[0], 2.5);
        assert_eq!(bounds[1], 4.5);
        // Along y the piece touches both whole boundaries.
        assert_eq!(bounds[2], 0.0);
        assert_eq!(bounds[3], 3.0);
    }

    #[test]
    fn test_point_mapping_hits_texel_centers() {
        let image = ImageData::new([4, 2, 1]);
        let mapping = TextureMapping::new(&image, ScalarOrigin::Point);
        assert!((mapping.offset[0] - 0.125).abs() < 1e-12);
        assert!((mapping.offset[0] + mapping.scale[0] - 0.875).abs() < 1e-12);
        assert!((mapping.offset[2] - 0.5).abs() < 1e-12);
        assert!(mapping.scale[2].abs() < 1e-12);
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let corners = cube_vertices(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).map(Vec3::from);
        let center = Vec3::splat(0.5);
        for tri in CUBE_INDICES.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| corners[i as usize]);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid - center) > 0.0, "inward triangle {tri:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_bounds_are_ordered(
            nx in 1u32..8, ny in 1u32..8, nz in 1u32..8,
            sx in -4.0f64..4.0, sy in -4.0f64..4.0, sz in -4.0f64..4.0,
            cells in any::<bool>(),
        ) {
            let mut image = ImageData::new([nx, ny, nz]);
            image.set_spacing(DVec3::new(sx, sy, sz));
            let origin = if cells { ScalarOrigin::Cell } else { ScalarOrigin::Point };
            let bounds = compute_bounds(&image, origin);
            for axis in 0..3 {
                prop_assert!(bounds[2 * axis] <= bounds[2 * axis + 1]);
            }
        }
    }
}
