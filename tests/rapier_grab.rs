//! RapierWorld 上的端到端抓取

use glam::Vec3;
use proximity_grab::grab::ScanRequest;
use proximity_grab::{
    BodyHandle, BodyIdentity, BodyRef, ColliderKinds, GrabEngine, GrabError, GrabMode,
    GrabSettings, Phase, PhysicsWorld, RapierWorld, SpatialScanner,
};
use rapier3d::na::Vector3;
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, RigidBodyType};

const DT: f32 = 1.0 / 60.0;

struct Scene {
    world: RapierWorld,
    hand: BodyHandle,
    arm: BodyHandle,
    ball: BodyHandle,
}

fn scene() -> Scene {
    let mut world = RapierWorld::new(Vec3::ZERO);
    let hand = world.insert_body(
        RigidBodyBuilder::kinematic_position_based().translation(Vector3::new(0.0, 1.0, 0.0)).build(),
        ColliderBuilder::ball(0.04).build(),
        BodyIdentity::new("Person", "rHand"),
    );
    let arm = world.insert_body(
        RigidBodyBuilder::dynamic().translation(Vector3::new(0.0, 1.05, 0.0)).build(),
        ColliderBuilder::ball(0.03).build(),
        BodyIdentity::new("Person", "rForeArm"),
    );
    let ball = world.insert_body(
        RigidBodyBuilder::dynamic().translation(Vector3::new(0.1, 1.0, 0.0)).build(),
        ColliderBuilder::ball(0.03).density(500.0).build(),
        BodyIdentity::new("Ball", "object"),
    );
    Scene { world, hand, arm, ball }
}

fn engine(scene: &Scene, mode: GrabMode) -> GrabEngine {
    let mut engine = GrabEngine::with_settings(GrabSettings { mode, ..Default::default() });
    engine.set_origin(BodyRef::new(scene.hand, BodyIdentity::new("Person", "rHand")));
    engine
}

fn run(engine: &mut GrabEngine, world: &mut RapierWorld, frames: usize) {
    for _ in 0..frames {
        engine.update(world, DT);
        world.step(DT);
    }
}

#[test]
fn test_scan_skips_source_container() {
    let s = scene();
    let scanner = SpatialScanner::new(ColliderKinds::SOLID);
    let request = ScanRequest {
        center: Vec3::new(0.0, 1.0, 0.0),
        radius: 0.15,
        excluded_container: Some("Person"),
        excluded_body: s.hand,
        excluded_targets: &[],
    };
    assert_eq!(scanner.find_target(&s.world, &request), Some(s.ball));

    // 缩小球体后只剩前臂重叠，它属于源容器
    let narrow = ScanRequest { radius: 0.06, ..request };
    assert!(s.world.query_overlapping(narrow.center, narrow.radius, false).iter().any(|h| h.body == s.arm));
    assert_eq!(scanner.find_target(&s.world, &narrow), None);
}

#[test]
fn test_spring_grab_lifecycle() {
    let mut s = scene();
    let mut engine = engine(&s, GrabMode::Hold);

    let info = engine.grab(&mut s.world).unwrap();
    assert_eq!(info.target.part_name, "object");
    assert_eq!(s.world.joint_count(), 1);

    run(&mut engine, &mut s.world, 60);
    assert_eq!(engine.attachments()[0].phase, Phase::Steady);

    // 弹簧关节把球拉到手的新位置 + 偏移
    let goal = Vec3::new(0.3, 1.1, 0.0);
    assert!(s.world.move_kinematic(s.hand, goal, None));
    run(&mut engine, &mut s.world, 180);
    let ball = s.world.body_pose(s.ball).unwrap();
    assert!(ball.position.distance(goal + Vec3::new(0.1, 0.0, 0.0)) < 1e-3);

    engine.release_all(&mut s.world, true);
    run(&mut engine, &mut s.world, 60);
    assert_eq!(engine.attachment_count(), 0);
    assert_eq!(s.world.joint_count(), 0);
    assert_eq!(s.world.is_kinematic(s.ball), Some(false));
}

#[test]
fn test_perfect_follow_moves_target() {
    let mut s = scene();
    let mut engine = engine(&s, GrabMode::Perfect);
    engine.grab(&mut s.world).unwrap();
    assert_eq!(s.world.is_kinematic(s.ball), Some(true));
    assert_eq!(s.world.joint_count(), 0);

    let goal = Vec3::new(0.5, 1.2, -0.3);
    assert!(s.world.move_kinematic(s.hand, goal, None));
    run(&mut engine, &mut s.world, 5);

    let hand = s.world.body_pose(s.hand).unwrap();
    let ball = s.world.body_pose(s.ball).unwrap();
    assert!(hand.position.distance(goal) < 1e-4);
    assert!(ball.position.distance(goal + Vec3::new(0.1, 0.0, 0.0)) < 1e-3);

    assert_eq!(engine.release_one(&mut s.world, 0, false), Ok(1));
    assert_eq!(s.world.is_kinematic(s.ball), Some(false));
}

#[test]
fn test_removed_target_is_tolerated() {
    let mut s = scene();
    let mut engine = engine(&s, GrabMode::Perfect);
    engine.grab(&mut s.world).unwrap();

    // 宿主先删掉目标刚体
    assert!(s.world.remove_body(s.ball));
    run(&mut engine, &mut s.world, 3);
    engine.shutdown(&mut s.world);
    assert_eq!(engine.attachment_count(), 0);

    // 只剩源容器内的刚体
    assert_eq!(engine.grab(&mut s.world), Err(GrabError::NothingInRange));
}

#[test]
fn test_perfect_grab_keeps_fixed_body_fixed() {
    let mut s = scene();
    s.world.gravity = Vector3::new(0.0, -9.81, 0.0);
    let shelf = s.world.insert_body(
        RigidBodyBuilder::fixed().translation(Vector3::new(-0.06, 1.0, 0.0)).build(),
        ColliderBuilder::ball(0.02).build(),
        BodyIdentity::new("Room", "shelf"),
    );
    let mut engine = engine(&s, GrabMode::Perfect);

    let info = engine.grab(&mut s.world).unwrap();
    assert_eq!(info.target, BodyIdentity::new("Room", "shelf"));
    assert_eq!(s.world.is_kinematic(shelf), Some(true));

    run(&mut engine, &mut s.world, 5);
    engine.shutdown(&mut s.world);
    assert_eq!(s.world.body(shelf).unwrap().body_type(), RigidBodyType::Fixed);

    for _ in 0..30 {
        s.world.step(DT);
    }
    let pose = s.world.body_pose(shelf).unwrap();
    assert!(pose.position.distance(Vec3::new(-0.06, 1.0, 0.0)) < 1e-5);
}
