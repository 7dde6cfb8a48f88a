/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotate clockwise (in image coordinates, y down) about `center` by `theta` radians.
    pub fn rotate_about(&self, center: &Point, theta: f32) -> Self {
        let (sin, cos) = theta.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self {
            x: center.x + cos * dx - sin * dy,
            y: center.y + sin * dx + cos * dy,
        }
    }
}

impl From<imageproc::point::Point<i32>> for Point {
    fn from(p: imageproc::point::Point<i32>) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        // Clockwise on screen: +x axis turns into +y axis.
        let p = Point::new(11.0, 10.0)
            .rotate_about(&Point::new(10.0, 10.0), std::f32::consts::FRAC_PI_2);
        assert!((p.x - 10.0).abs() < 1e-5);
        assert!((p.y - 11.0).abs() < 1e-5);
    }
}
