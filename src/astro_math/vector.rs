use std::ops::{Add, Mul, Sub};

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. Zero vectors stay zero.
    pub fn normalized(self) -> Vec3 {
        let length = self.length();
        if length <= f64::EPSILON {
            self
        } else {
            self * (1. / length)
        }
    }

    /// Linear blend, `t` is not clamped so values past 1 extrapolate
    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }

    /// Angle between two directions in radians
    pub fn angle_to(self, other: Vec3) -> f64 {
        let cross = Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        );
        cross.length().atan2(self.dot(other))
    }

    /// m * v
    pub fn rotate(self, m: &Matrix3) -> Vec3 {
        Vec3::new(
            m[0][0] * self.x + m[0][1] * self.y + m[0][2] * self.z,
            m[1][0] * self.x + m[1][1] * self.y + m[1][2] * self.z,
            m[2][0] * self.x + m[2][1] * self.y + m[2][2] * self.z,
        )
    }

    /// transpose(m) * v, the inverse rotation for orthonormal m
    pub fn rotate_inverse(self, m: &Matrix3) -> Vec3 {
        Vec3::new(
            m[0][0] * self.x + m[1][0] * self.y + m[2][0] * self.z,
            m[0][1] * self.x + m[1][1] * self.y + m[2][1] * self.z,
            m[0][2] * self.x + m[1][2] * self.y + m[2][2] * self.z,
        )
    }
}

pub type Matrix3 = [[f64; 3]; 3];

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}
