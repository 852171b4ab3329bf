use cgmath::{Deg, InnerSpace, Matrix3, Quaternion, Rad, Vector2, Vector3, Vector4};

pub type Vector2f = Vector2<f32>;
pub type Vector3f = Vector3<f32>;
pub type Vector4f = Vector4<f32>;

/// Threshold on |sin(pitch)| above which the decomposition treats the
/// rotation as gimbal locked and folds roll into yaw.
const GIMBAL_LOCK_EPSILON: f32 = 0.999_999;

/// Build the engine rotation matrix from a (pitch, yaw, roll) vector in degrees.
///
/// Sith orientations compose as `Rz(yaw) * Rx(pitch) * Ry(roll)`,
/// i.e. roll about Y is applied first, then pitch about X, then yaw about Z.
pub fn pyr_to_matrix3(pyr: Vector3f) -> Matrix3<f32> {
    Matrix3::from_angle_z(Deg(pyr.y)) * Matrix3::from_angle_x(Deg(pyr.x)) * Matrix3::from_angle_y(Deg(pyr.z))
}

/// Decompose a rotation matrix into (pitch, yaw, roll) degrees.
pub fn matrix3_to_pyr(m: &Matrix3<f32>) -> Vector3f {
    // cgmath stores columns: m.<col>.<row>
    let m00 = m.x.x;
    let m10 = m.x.y;
    let m20 = m.x.z;
    let m01 = m.y.x;
    let m11 = m.y.y;
    let m21 = m.y.z;
    let m22 = m.z.z;

    let sin_pitch = m21.clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();

    let (yaw, roll) = if sin_pitch.abs() < GIMBAL_LOCK_EPSILON {
        ((-m01).atan2(m11), (-m20).atan2(m22))
    } else {
        (m10.atan2(m00), 0.0)
    };

    Vector3f::new(
        Deg::from(Rad(pitch)).0,
        Deg::from(Rad(yaw)).0,
        Deg::from(Rad(roll)).0,
    )
}

pub fn pyr_to_quaternion(pyr: Vector3f) -> Quaternion<f32> {
    Quaternion::from(pyr_to_matrix3(pyr)).normalize()
}

/// Convert a (possibly unnormalized) quaternion to (pitch, yaw, roll) degrees.
pub fn quaternion_to_pyr(q: Quaternion<f32>) -> Vector3f {
    let q = if q.magnitude2() > 0.0 {
        q.normalize()
    } else {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    };
    matrix3_to_pyr(&Matrix3::from(q))
}

pub fn is_zero3(v: Vector3f) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vector3f, b: Vector3f) {
        let d = a - b;
        assert!(
            d.x.abs() < 1e-3 && d.y.abs() < 1e-3 && d.z.abs() < 1e-3,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn single_axis_rotations() {
        // Pure yaw rotates +X towards +Y around Z.
        let m = pyr_to_matrix3(Vector3f::new(0.0, 90.0, 0.0));
        let v = m * Vector3f::new(1.0, 0.0, 0.0);
        assert_vec_close(v, Vector3f::new(0.0, 1.0, 0.0));

        // Pure pitch rotates +Y towards +Z around X.
        let m = pyr_to_matrix3(Vector3f::new(90.0, 0.0, 0.0));
        let v = m * Vector3f::new(0.0, 1.0, 0.0);
        assert_vec_close(v, Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn matrix_roundtrip_recovers_pyr() {
        for pyr in [
            Vector3f::new(10.0, 20.0, 30.0),
            Vector3f::new(-45.0, 170.0, -80.0),
            Vector3f::new(0.0, -90.0, 12.5),
            Vector3f::new(60.0, 0.0, 0.0),
        ] {
            let back = matrix3_to_pyr(&pyr_to_matrix3(pyr));
            assert_vec_close(back, pyr);
        }
    }

    #[test]
    fn gimbal_lock_folds_roll_into_yaw() {
        let pyr = Vector3f::new(90.0, 30.0, 0.0);
        let back = matrix3_to_pyr(&pyr_to_matrix3(pyr));
        assert!((back.x - 90.0).abs() < 1e-2);
        assert_eq!(back.z, 0.0);
        assert!((back.y - 30.0).abs() < 1e-2);
    }

    #[test]
    fn quaternion_roundtrip_normalizes_input() {
        let pyr = Vector3f::new(15.0, -35.0, 50.0);
        let q = pyr_to_quaternion(pyr) * 3.0;
        assert_vec_close(quaternion_to_pyr(q), pyr);
    }
}
