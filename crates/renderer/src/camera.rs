use glam::{Mat4, Vec3};

const FOV_Y_DEGREES: f32 = 70.0;
const NEAR: f32 = 0.001;
const FAR: f32 = 5000.0;
const DISTANCE: f32 = 1500.0;

/// Fixed perspective camera looking down -Z at the point grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, DISTANCE),
            fov_y_degrees: FOV_Y_DEGREES,
            aspect: aspect.max(f32::EPSILON),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(f32::EPSILON);
    }

    pub fn view_projection(&self) -> Mat4 {
        let projection =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, NEAR, FAR);
        let view = Mat4::look_at_rh(self.eye, Vec3::ZERO, Vec3::Y);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(camera: &Camera, point: Vec3) -> Vec3 {
        let clip = camera.view_projection() * Vec4::new(point.x, point.y, point.z, 1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn origin_projects_to_centre() {
        let ndc = project(&Camera::new(16.0 / 9.0), Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn grid_fits_vertically_at_default_distance() {
        let camera = Camera::new(1.0);
        let grid = sceneconfig::Grid::default();
        let top = project(&camera, Vec3::new(0.0, grid.height * 0.5, 0.0));
        assert!(top.y > 0.0 && top.y < 1.0, "top edge at {}", top.y);
    }

    #[test]
    fn wider_aspect_compresses_x() {
        let point = Vec3::new(100.0, 0.0, 0.0);
        let square = project(&Camera::new(1.0), point);
        let mut wide = Camera::new(1.0);
        wide.set_aspect(2.0);
        let wide = project(&wide, point);
        assert!((wide.x * 2.0 - square.x).abs() < 1e-5);
    }
}
