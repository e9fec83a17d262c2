// Geometry primitives shared by the collision and navigation sides:
// vectors, axis-aligned boxes, Euler rotation matrices and the ray tests
// the line-of-sight engine is built on.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }
}

impl std::ops::Add for Vector3 {
    type Output = Vector3;
    fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Mul<f32> for Vector3 {
    type Output = Vector3;
    fn mul(self, s: f32) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aabb {
    pub min: Vector3,
    pub max: Vector3,
}

impl Aabb {
    pub fn from_point(p: Vector3) -> Self {
        Self { min: p, max: p }
    }

    pub fn merge_point(&mut self, p: Vector3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Row-major 3x3 rotation matrix
#[derive(Debug, Clone, Copy)]
pub struct Mat3(pub [[f32; 3]; 3]);

impl Mat3 {
    /// Rotation from Euler angles applied Z, then Y, then X (radians)
    pub fn from_euler_zyx(z: f32, y: f32, x: f32) -> Self {
        let (sz, cz) = z.sin_cos();
        let (sy, cy) = y.sin_cos();
        let (sx, cx) = x.sin_cos();

        Mat3([
            [cy * cz, cz * sx * sy - cx * sz, cx * cz * sy + sx * sz],
            [cy * sz, cx * cz + sx * sy * sz, -cz * sx + cx * sy * sz],
            [-sy, cy * sx, cx * cy],
        ])
    }

    pub fn mul_vec3(&self, v: Vector3) -> Vector3 {
        let m = &self.0;
        Vector3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Transpose; for a rotation matrix this is the inverse
    pub fn transposed(&self) -> Self {
        let m = &self.0;
        Mat3([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }
}

pub fn deg_to_rad(value: f32) -> f32 {
    value * std::f32::consts::PI / 180.0
}

/// Signed double area of a triangle projected onto the XY plane.
/// Positive when c lies right of the a->b direction.
pub fn tri_area_2d(a: Vector3, b: Vector3, c: Vector3) -> f32 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let acx = c.x - a.x;
    let acy = c.y - a.y;
    acx * aby - abx * acy
}

/// Slab test of a segment `orig + t * dir, t in [0, max_t]` against a box.
pub fn segment_intersects_aabb(orig: Vector3, dir: Vector3, max_t: f32, aabb: &Aabb) -> bool {
    let mut t_min = 0.0f32;
    let mut t_max = max_t;

    for axis in 0..3 {
        let (o, d, lo, hi) = match axis {
            0 => (orig.x, dir.x, aabb.min.x, aabb.max.x),
            1 => (orig.y, dir.y, aabb.min.y, aabb.max.y),
            _ => (orig.z, dir.z, aabb.min.z, aabb.max.z),
        };
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = if inv >= 0.0 {
            ((lo - o) * inv, (hi - o) * inv)
        } else {
            ((hi - o) * inv, (lo - o) * inv)
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }
    true
}

/// Moeller-Trumbore ray/triangle intersection. Returns the parametric
/// distance along `dir` when the segment `orig + t * dir, t in [0, max_t]`
/// crosses the triangle; rays parallel to the triangle plane miss.
pub fn ray_triangle_intersect(
    orig: Vector3,
    dir: Vector3,
    max_t: f32,
    v0: Vector3,
    v1: Vector3,
    v2: Vector3,
) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = orig - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < 0.0 || t > max_t {
        return None;
    }
    Some(t)
}
