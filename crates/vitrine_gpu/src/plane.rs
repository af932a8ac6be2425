//! Subdivided plane geometry for carousel items.
//!
//! Each item renders a unit-width plane whose height is corrected for the
//! media's aspect ratio. The fixed displacement program in the shader needs
//! vertex density, so the plane is tessellated rather than a single quad.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Default number of subdivisions per plane edge.
pub const PLANE_DIVISIONS: u32 = 128;

/// Vertex layout shared with the plane shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Generate grid vertices and indices for a plane of width 1 and height
/// `1 / aspect`, centered at the origin.
pub fn plane_grid(aspect: f32, divisions: u32) -> (Vec<Vertex>, Vec<u32>) {
    let divisions = divisions.max(1);
    let height = if aspect.is_finite() && aspect > 0.0 {
        1.0 / aspect
    } else {
        1.0
    };

    let side = divisions + 1;
    let mut vertices = Vec::with_capacity((side * side) as usize);
    for row in 0..side {
        for col in 0..side {
            let u = col as f32 / divisions as f32;
            let v = row as f32 / divisions as f32;
            vertices.push(Vertex {
                position: [u - 0.5, (0.5 - v) * height, 0.0],
                tex_coords: [u, v],
            });
        }
    }

    let mut indices = Vec::with_capacity((divisions * divisions * 6) as usize);
    for row in 0..divisions {
        for col in 0..divisions {
            let top_left = row * side + col;
            let top_right = top_left + 1;
            let bottom_left = top_left + side;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                bottom_right,
                top_left,
                bottom_right,
                top_right,
            ]);
        }
    }

    (vertices, indices)
}

/// GPU buffers for one item's plane.
pub struct PlaneGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl PlaneGeometry {
    /// Build plane buffers for media with the given aspect ratio.
    pub fn new(device: &wgpu::Device, aspect: f32, divisions: u32) -> Self {
        let (vertices, indices) = plane_grid(aspect, divisions);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Plane Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Plane Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_counts() {
        let (vertices, indices) = plane_grid(1.0, 4);
        assert_eq!(vertices.len(), 25);
        assert_eq!(indices.len(), 4 * 4 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn test_grid_aspect_correction() {
        let (vertices, _) = plane_grid(2.0, 1);
        // Width 1, height 1/2, centered.
        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = vertices.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -0.5);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 0.5);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -0.25);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 0.25);
    }

    #[test]
    fn test_grid_degenerate_aspect_falls_back_to_square() {
        let (vertices, _) = plane_grid(0.0, 1);
        let ys: Vec<f32> = vertices.iter().map(|v| v.position[1]).collect();
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 0.5);
    }

    #[test]
    fn test_uv_corners() {
        let (vertices, _) = plane_grid(1.0, 1);
        assert_eq!(vertices[0].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[3].tex_coords, [1.0, 1.0]);
    }
}
