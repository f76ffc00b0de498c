//! 抓取演示：手部刚体抓住附近的球，保持两秒后平滑释放
//!
//! 运行：`RUST_LOG=debug cargo run --features demo --bin grab_demo`

use glam::Vec3;
use log::info;
use proximity_grab::{
    BodyIdentity, BodyRef, GrabEngine, GrabMode, GrabSettings, PhysicsWorld, RapierWorld, Stiffness,
};
use rapier3d::na::Vector3;
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder};

const DT: f32 = 1.0 / 60.0;

fn main() {
    env_logger::init();

    let mut world = RapierWorld::default();
    let hand_identity = BodyIdentity::new("Person", "rHand");
    let hand = world.insert_body(
        RigidBodyBuilder::kinematic_position_based()
            .translation(Vector3::new(0.0, 1.0, 0.0))
            .build(),
        ColliderBuilder::ball(0.04).build(),
        hand_identity.clone(),
    );
    world.insert_body(
        RigidBodyBuilder::dynamic().translation(Vector3::new(0.0, 1.06, 0.0)).build(),
        ColliderBuilder::ball(0.03).build(),
        BodyIdentity::new("Person", "rForeArm"),
    );
    let ball = world.insert_body(
        RigidBodyBuilder::dynamic().translation(Vector3::new(0.1, 1.0, 0.0)).build(),
        ColliderBuilder::ball(0.03).density(500.0).build(),
        BodyIdentity::new("Ball", "object"),
    );

    let mut engine = GrabEngine::with_settings(GrabSettings {
        stiffness: Stiffness::Firm,
        mode: GrabMode::Hold,
        debug_log: true,
        ..Default::default()
    });
    engine.subscribe(Box::new(|change| {
        info!("成员变化: {:?} x{} -> 存活 {}", change.kind, change.affected, change.count);
    }));
    engine.set_origin(BodyRef::new(hand, hand_identity));

    match engine.grab(&mut world) {
        Ok(attached) => info!("已抓取 {} ({})", attached.target, attached.mode.name()),
        Err(e) => info!("抓取失败: {e}"),
    }
    info!("状态: {}", engine.status());

    // 手沿 x 轴缓慢移动，球应跟随
    let mut elapsed = 0.0;
    while elapsed < 2.0 {
        let hand_pos = Vec3::new(elapsed * 0.2, 1.0, 0.0);
        world.move_kinematic(hand, hand_pos, None);
        engine.update(&mut world, DT);
        world.step(DT);
        elapsed += DT;
    }
    for info in engine.attachments() {
        info!("#{} {} {:?} blend={:.2}", info.index, info.target, info.phase, info.blend);
    }
    if let Some(pose) = world.body_pose(ball) {
        info!("球位置: {:?}", pose.position);
    }

    let releasing = engine.release_all(&mut world, true);
    info!("平滑释放 {releasing} 个, 状态: {}", engine.status());

    let mut frames = 0;
    while engine.attachment_count() > 0 && frames < 600 {
        engine.update(&mut world, DT);
        world.step(DT);
        frames += 1;
    }
    info!("淡出用时 {frames} 帧, 剩余关节 {}", world.joint_count());

    engine.shutdown(&mut world);
}
