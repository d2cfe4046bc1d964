use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl PointVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Regular grid of points on a rectangle centred at the origin in the XY plane.
///
/// Rows run top to bottom, columns left to right; `uv` has `u` growing to the
/// right and `v` growing upwards so `(0, 0)` is the bottom-left corner.
#[derive(Clone, Debug)]
pub struct PointGrid {
    vertices: Vec<PointVertex>,
    columns: u32,
    rows: u32,
}

impl PointGrid {
    pub fn new(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let segments_x = segments_x.max(1);
        let segments_y = segments_y.max(1);
        let columns = segments_x + 1;
        let rows = segments_y + 1;
        let half_width = width * 0.5;
        let half_height = height * 0.5;

        let mut vertices = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            let v = 1.0 - row as f32 / segments_y as f32;
            let y = half_height - row as f32 * height / segments_y as f32;
            for column in 0..columns {
                let u = column as f32 / segments_x as f32;
                let x = column as f32 * width / segments_x as f32 - half_width;
                vertices.push(PointVertex {
                    position: [x, y, 0.0],
                    uv: [u, v],
                });
            }
        }

        Self {
            vertices,
            columns,
            rows,
        }
    }

    pub fn from_config(grid: &sceneconfig::Grid) -> Self {
        Self::new(grid.width, grid.height, grid.segments_x, grid.segments_y)
    }

    pub fn vertices(&self) -> &[PointVertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_count_matches_segments() {
        let grid = PointGrid::new(10.0, 20.0, 4, 3);
        assert_eq!(grid.len(), 5 * 4);
        assert_eq!(grid.dimensions(), (5, 4));

        let reference = PointGrid::from_config(&sceneconfig::Grid::default());
        assert_eq!(reference.len(), 481 * 821);
    }

    #[test]
    fn corners_span_the_rectangle() {
        let grid = PointGrid::new(10.0, 20.0, 4, 3);
        let vertices = grid.vertices();
        let first = vertices[0];
        let last = vertices[vertices.len() - 1];
        assert_eq!(first.position, [-5.0, 10.0, 0.0]);
        assert_eq!(first.uv, [0.0, 1.0]);
        assert_eq!(last.position, [5.0, -10.0, 0.0]);
        assert_eq!(last.uv, [1.0, 0.0]);
    }

    #[test]
    fn grid_lies_in_the_xy_plane() {
        let grid = PointGrid::new(3.0, 3.0, 2, 2);
        assert!(grid.vertices().iter().all(|vertex| vertex.position[2] == 0.0));
        assert_eq!(grid.vertices()[4].position, [0.0, 0.0, 0.0]);
        assert_eq!(grid.vertices()[4].uv, [0.5, 0.5]);
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<PointVertex>(), 20);
        assert_eq!(PointVertex::layout().array_stride, 20);
    }
}
