// racer_core/src/vehicle/body.rs

use crate::error::ClassifyError;
use crate::types::{Pose, Vec3};
use crate::vehicle::classify::{classify, VehicleSkeleton};
use crate::vehicle::parts::{MeshPart, SourceTitle, WheelSlot};

/// World pose of a part rigidly attached to the chassis.
///
/// The position is the chassis position plus the part's rest offset rotated
/// by the inverse chassis rotation. The part takes the chassis orientation.
pub fn world_transform(chassis_pose: &Pose, initial_local_position: &Vec3) -> Pose {
    let offset = chassis_pose.rotation.inverse() * initial_local_position;
    Pose::from_parts(
        (chassis_pose.translation.vector + offset).into(),
        chassis_pose.rotation,
    )
}

/// A mesh part placed in the world.
#[derive(Debug, Clone)]
pub struct PartInstance {
    pub part: MeshPart,
    pub pose: Pose,
    pub enabled: bool,
}

impl PartInstance {
    fn new(part: MeshPart, enabled: bool) -> Self {
        let pose = Pose::from_parts(part.initial_position.into(), part.initial_orientation);
        Self {
            part,
            pose,
            enabled,
        }
    }
}

/// The visual side of a car: one body, four wheels and any number of misc
/// parts. The topology never changes after construction.
#[derive(Debug, Clone)]
pub struct VehicleBody {
    title: SourceTitle,
    body: PartInstance,
    wheels: [PartInstance; 4],
    misc: Vec<PartInstance>,
    /// Duplicate meshes handed over by the loader. Kept so nothing the loader
    /// delivered is dropped, never drawn.
    aliases: Vec<MeshPart>,
}

impl VehicleBody {
    /// Classifies `parts` and builds the body from the result.
    pub fn from_parts(parts: Vec<MeshPart>, title: SourceTitle) -> Result<Self, ClassifyError> {
        let skeleton = classify(&parts, title)?;
        Ok(Self::from_skeleton(parts, &skeleton, title))
    }

    pub fn from_skeleton(parts: Vec<MeshPart>, skeleton: &VehicleSkeleton, title: SourceTitle) -> Self {
        let instance = |index: usize, enabled: bool| PartInstance::new(parts[index].clone(), enabled);

        let body = instance(skeleton.body, true);
        // A shared wheel mesh is instanced per slot; each slot gets its own pose.
        let wheels = WheelSlot::ALL.map(|slot| instance(skeleton.wheel(slot), true));
        let misc = skeleton
            .misc
            .iter()
            .map(|m| instance(m.index, m.enabled))
            .collect();
        let aliases = skeleton.aliases.iter().map(|&i| parts[i].clone()).collect();

        Self {
            title,
            body,
            wheels,
            misc,
            aliases,
        }
    }

    pub fn title(&self) -> SourceTitle {
        self.title
    }

    pub fn body(&self) -> &PartInstance {
        &self.body
    }

    pub fn wheel(&self, slot: WheelSlot) -> &PartInstance {
        &self.wheels[slot.index()]
    }

    pub fn wheels(&self) -> &[PartInstance; 4] {
        &self.wheels
    }

    pub fn misc(&self) -> &[PartInstance] {
        &self.misc
    }

    pub fn aliases(&self) -> &[MeshPart] {
        &self.aliases
    }

    /// Body, wheels and enabled misc parts, in draw order.
    pub fn enabled_parts(&self) -> impl Iterator<Item = &PartInstance> {
        std::iter::once(&self.body)
            .chain(self.wheels.iter())
            .chain(self.misc.iter())
            .filter(|p| p.enabled)
    }

    /// Half extents of the body mesh, used for the chassis collider.
    pub fn chassis_half_extents(&self) -> Vec3 {
        self.body.part.geometry.half_extents()
    }

    /// `(radius, width)` of the front-left wheel mesh.
    pub fn wheel_dimensions(&self) -> (f32, f32) {
        let half = self.wheel(WheelSlot::FrontLeft).part.geometry.half_extents();
        (half.z, half.x)
    }

    /// Rest positions of the four wheels, used as suspension mount points.
    pub fn wheel_connection_points(&self) -> [Vec3; 4] {
        WheelSlot::ALL.map(|slot| self.wheel(slot).part.initial_position)
    }

    /// Moves the body and misc parts with the chassis.
    pub fn follow_chassis(&mut self, chassis_pose: &Pose) {
        self.body.pose = world_transform(chassis_pose, &self.body.part.initial_position);
        for part in &mut self.misc {
            part.pose = world_transform(chassis_pose, &part.part.initial_position);
        }
    }

    pub fn set_wheel_pose(&mut self, slot: WheelSlot, pose: Pose) {
        self.wheels[slot.index()].pose = pose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rotation;
    use crate::vehicle::parts::MeshGeometry;
    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_2;

    fn boxed(name: &str, half: [f32; 3], at: Vec3) -> MeshPart {
        let geometry = MeshGeometry {
            vertices: vec![
                Point3::new(-half[0], -half[1], -half[2]),
                Point3::new(half[0], half[1], half[2]),
            ],
            ..Default::default()
        };
        MeshPart::new(name, geometry, at)
    }

    fn nfs4_car() -> VehicleBody {
        let parts = vec![
            boxed(":HB", [0.9, 0.5, 2.2], Vec3::new(0.0, 0.4, 0.0)),
            boxed(":HLFW", [0.12, 0.3, 0.33], Vec3::new(-0.8, 0.0, -1.4)),
            boxed(":HRFW", [0.12, 0.3, 0.33], Vec3::new(0.8, 0.0, -1.4)),
            boxed(":HLRW", [0.12, 0.3, 0.33], Vec3::new(-0.8, 0.0, 1.3)),
            boxed(":HRRW", [0.12, 0.3, 0.33], Vec3::new(0.8, 0.0, 1.3)),
            boxed(":OS", [0.5, 0.05, 0.1], Vec3::new(0.0, 0.9, 1.9)),
            boxed(":LB", [0.9, 0.5, 2.2], Vec3::zeros()),
        ];
        VehicleBody::from_parts(parts, SourceTitle::Nfs4).unwrap()
    }

    #[test]
    fn world_transform_without_rotation_is_a_translation() {
        let chassis = Pose::translation(10.0, 0.0, -5.0);
        let pose = world_transform(&chassis, &Vec3::new(1.0, 2.0, 3.0));
        assert_abs_diff_eq!(pose.translation.vector, Vec3::new(11.0, 2.0, -2.0));
        assert_abs_diff_eq!(pose.rotation.angle(), 0.0);
    }

    #[test]
    fn world_transform_rotates_offset_by_inverse() {
        let rotation = Rotation::from_axis_angle(&Vec3::y_axis(), FRAC_PI_2);
        let chassis = Pose::from_parts(Vec3::new(0.0, 1.0, 0.0).into(), rotation);

        let pose = world_transform(&chassis, &Vec3::new(1.0, 0.0, 0.0));

        // Inverse of a +90° yaw takes +X to +Z.
        assert_abs_diff_eq!(pose.translation.vector, Vec3::new(0.0, 1.0, 1.0), epsilon = 1e-6);
        assert_abs_diff_eq!(pose.rotation.angle_to(&rotation), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn body_enables_each_mesh_once() {
        let car = nfs4_car();
        let names: Vec<&str> = car.enabled_parts().map(|p| p.part.name.as_str()).collect();
        assert_eq!(names, vec![":HB", ":HLFW", ":HRFW", ":HLRW", ":HRRW", ":OS"]);
        assert!(!car.misc()[1].enabled);
    }

    #[test]
    fn wheel_dimensions_come_from_front_left_mesh() {
        let car = nfs4_car();
        let (radius, width) = car.wheel_dimensions();
        assert_abs_diff_eq!(radius, 0.33);
        assert_abs_diff_eq!(width, 0.12);
        assert_abs_diff_eq!(
            car.wheel_connection_points()[3],
            Vec3::new(0.8, 0.0, 1.3)
        );
    }

    #[test]
    fn follow_chassis_moves_body_and_misc_only() {
        let mut car = nfs4_car();
        let wheel_before = car.wheel(WheelSlot::RearLeft).pose;
        let chassis = Pose::translation(0.0, 0.0, 20.0);

        car.follow_chassis(&chassis);

        assert_abs_diff_eq!(car.body().pose.translation.vector, Vec3::new(0.0, 0.4, 20.0));
        assert_abs_diff_eq!(
            car.misc()[0].pose.translation.vector,
            Vec3::new(0.0, 0.9, 21.9)
        );
        assert_eq!(car.wheel(WheelSlot::RearLeft).pose, wheel_before);
    }
}
