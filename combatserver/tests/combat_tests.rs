//! 전투 엔진 통합 테스트
//!
//! tokio 가상 시간(`start_paused`)으로 공격 루프의 타이밍을 재현합니다.

mod common;

use std::time::Duration;
use tokio::time::{sleep, Instant};

use combatserver::attribute::ItemEffects;
use combatserver::config::CombatConfig;
use combatserver::traits::EquippedWeapon;
use combatserver::{AttackResolution, CombatEvent, CombatState, DerivedStat, WeaponSlot};
use common::{test_config, Harness};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[tokio::test(start_paused = true)]
async fn test_attack_respects_weapon_interval() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 5.0, 50.0).await;
    h.place("m1", 10.0, 0.0);
    h.sessions.allocate("p1");
    let target = h.stats.get_stats("m1").await.unwrap();
    let t0 = Instant::now();

    let first = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0).await;
    assert_eq!(first, AttackResolution::Hit { damage: 30.0, lethal: false });
    assert_eq!(h.notifier.swings("p1"), 1);

    let early = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(4000)).await;
    assert_eq!(early, AttackResolution::CoolingDown);
    assert_eq!(h.notifier.swings("p1"), 1);

    // 공격 가능 시점 100ms 전부터 스윙 신호만 보냅니다
    let lead = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(4900)).await;
    assert_eq!(lead, AttackResolution::Telegraphed);
    assert_eq!(h.stored_hp("m1"), Some(970.0));

    let again = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(4950)).await;
    assert_eq!(again, AttackResolution::CoolingDown);

    let second = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(5100)).await;
    assert_eq!(second, AttackResolution::Hit { damage: 30.0, lethal: false });

    // 공격 1회당 스윙 신호는 한 번
    assert_eq!(h.notifier.swings("p1"), 2);
    assert_eq!(h.stored_hp("m1"), Some(940.0));
}

#[tokio::test(start_paused = true)]
async fn test_attack_speed_shortens_interval() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 10.0, 4.0, 50.0).await;
    h.world.set_derived_stats(
        "p1",
        [(DerivedStat::PhysicalAmp, 1.0), (DerivedStat::AttackSpeed, 100.0)].into(),
    );
    h.place("m1", 10.0, 0.0);
    h.sessions.allocate("p1");
    let target = h.stats.get_stats("m1").await.unwrap();
    let t0 = Instant::now();

    h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0).await;
    let hit = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(2000)).await;
    assert_eq!(hit, AttackResolution::Hit { damage: 10.0, lethal: false });
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_sends_nothing() {
    let h = Harness::new();
    h.put_actor("m1", 100.0, 100.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 500.0, 0.0);

    assert!(h.engine.request_attack("p1", vec!["m1".to_string()]).await);
    sleep(ms(3000)).await;

    assert_eq!(h.notifier.swings("p1"), 0);
    assert_eq!(h.stored_hp("m1"), Some(100.0));
    // 살아있는 타겟이 있으므로 교전은 유지됩니다
    assert!(h.engine.is_in_combat("p1"));
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_weapon_is_noop() {
    let h = Harness::new();
    h.put_actor("m1", 100.0, 100.0).await;
    h.place("p1", 0.0, 0.0);
    h.place("m1", 10.0, 0.0);
    let target = h.stats.get_stats("m1").await.unwrap();

    let result = h
        .engine
        .try_attack("p1", &target, WeaponSlot::MainHand, Instant::now())
        .await;

    assert_eq!(result, AttackResolution::NoWeapon);
    assert!(h.notifier.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_range_applies_when_weapon_has_none() {
    let h = Harness::new();
    h.put_actor("m1", 100.0, 100.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.world.equip(
        "p1",
        WeaponSlot::MainHand,
        EquippedWeapon {
            item_instance_id: "spear".to_string(),
            attack_range: None,
            item_effects: ItemEffects::from([(DerivedStat::WeaponDamage, 30.0)]),
        },
    );
    h.place("m1", 150.0, 0.0);
    h.sessions.allocate("p1");
    let target = h.stats.get_stats("m1").await.unwrap();

    let result = h
        .engine
        .try_attack("p1", &target, WeaponSlot::MainHand, Instant::now())
        .await;
    assert_eq!(result, AttackResolution::Hit { damage: 30.0, lethal: false });
}

#[tokio::test(start_paused = true)]
async fn test_lethal_hit_removes_target_and_ends_loop() {
    let h = Harness::new();
    h.put_actor("m1", 20.0, 100.0).await;
    h.sessions.allocate("m1");
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    assert!(h.engine.request_attack("p1", vec!["m1".to_string()]).await);
    assert!(h.engine.is_in_combat("p1"));

    sleep(ms(500)).await;

    assert!(!h.repository.contains("m1"));
    assert!(!h.sessions.contains("m1"));
    assert_eq!(h.notifier.removals("m1"), 1);
    assert!(h.sessions.targets("p1").is_empty());
    assert!(!h.engine.is_in_combat("p1"));
    assert!(!h.sessions.contains("p1"));
}

#[tokio::test(start_paused = true)]
async fn test_two_attackers_kill_target_once() {
    let h = Harness::new();
    h.put_actor("m1", 20.0, 100.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.arm_attacker("p2", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    h.engine.request_attack("p2", vec!["m1".to_string()]).await;
    sleep(ms(500)).await;

    assert_eq!(h.notifier.removals("m1"), 1);
    assert!(h.engine.in_combat_actors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loop_exits_when_targets_have_no_stats() {
    let h = Harness::new();
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;

    assert!(h.engine.request_attack("p1", vec!["ghost".to_string()]).await);
    sleep(ms(300)).await;

    assert!(!h.engine.is_in_combat("p1"));
    assert!(!h.sessions.contains("p1"));
    assert_eq!(h.sessions.state("p1"), CombatState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_attacker_without_live_stats_is_dropped() {
    let h = Harness::new();
    h.put_actor("m1", 100.0, 100.0).await;
    h.place("m1", 10.0, 0.0);

    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.stats.delete_stats("p1").await.unwrap();
    assert!(!h.engine.request_attack("p1", vec!["m1".to_string()]).await);

    h.put_actor("p2", 0.0, 100.0).await;
    h.arm_attacker("p2", 30.0, 2.0, 50.0).await;
    assert!(!h.engine.request_attack("p2", vec!["m1".to_string()]).await);

    sleep(ms(3000)).await;
    assert!(h.engine.in_combat_actors().is_empty());
    assert!(h.sessions.is_empty());
    assert_eq!(h.stored_hp("m1"), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn test_attacker_losing_stats_leaves_combat() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    assert!(h.engine.request_attack("p1", vec!["m1".to_string()]).await);
    sleep(ms(50)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));

    h.stats.delete_stats("p1").await.unwrap();
    sleep(ms(3000)).await;

    assert_eq!(h.stored_hp("m1"), Some(970.0));
    assert!(!h.engine.is_in_combat("p1"));
    assert!(!h.sessions.contains("p1"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_request_cancels_loop_immediately() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 5.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    sleep(ms(50)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));

    h.engine.request_stop_attack("p1");
    assert!(!h.engine.is_in_combat("p1"));
    assert!(!h.sessions.contains("p1"));

    sleep(ms(20_000)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));
    assert_eq!(h.notifier.stats_updates("m1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_keeps_cooldown() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    sleep(ms(50)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));

    h.engine.request_stop_attack("p1");
    assert!(!h.sessions.contains("p1"));
    assert!(h.engine.request_attack("p1", vec!["m1".to_string()]).await);

    // 재요청해도 첫 공격 후 2초가 지나야 다음 공격
    sleep(ms(1000)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));

    sleep(ms(1150)).await;
    assert_eq!(h.stored_hp("m1"), Some(940.0));
    assert_eq!(h.notifier.stats_updates("m1"), 2);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_oversized_swing_lead_does_not_overflow() {
    let h = Harness::with_config(CombatConfig {
        swing_lead_ms: u64::MAX,
        ..test_config()
    });
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);
    h.sessions.allocate("p1");
    let target = h.stats.get_stats("m1").await.unwrap();
    let t0 = Instant::now();

    let first = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0).await;
    assert_eq!(first, AttackResolution::Hit { damage: 30.0, lethal: false });

    let lead = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(10)).await;
    assert_eq!(lead, AttackResolution::Telegraphed);

    let again = h.engine.try_attack("p1", &target, WeaponSlot::MainHand, t0 + ms(20)).await;
    assert_eq!(again, AttackResolution::CoolingDown);
}

#[tokio::test(start_paused = true)]
async fn test_request_without_targets_or_while_stunned_is_dropped() {
    let h = Harness::new();
    h.put_actor("m1", 100.0, 100.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;

    assert!(!h.engine.request_attack("p1", Vec::new()).await);
    assert!(!h.engine.is_in_combat("p1"));

    h.world.set_can_act("p1", false);
    assert!(!h.engine.request_attack("p1", vec!["m1".to_string()]).await);
    assert!(!h.engine.is_in_combat("p1"));
    assert!(!h.sessions.contains("p1"));
}

#[tokio::test(start_paused = true)]
async fn test_incapacitated_attacker_keeps_engagement_without_swinging() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    h.world.set_can_act("p1", false);
    sleep(ms(1000)).await;

    assert_eq!(h.stored_hp("m1"), Some(1000.0));
    assert!(h.engine.is_in_combat("p1"));

    h.world.set_can_act("p1", true);
    sleep(ms(200)).await;
    assert_eq!(h.stored_hp("m1"), Some(970.0));
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_new_request_replaces_targets() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.put_actor("m2", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);
    h.place("m2", 0.0, 10.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    h.engine.request_attack("p1", vec!["m2".to_string()]).await;

    let targets: Vec<_> = h.sessions.targets("p1").into_iter().collect();
    assert_eq!(targets, vec!["m2".to_string()]);
    assert_eq!(h.engine.in_combat_actors(), vec!["p1".to_string()]);
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_channeling_suppresses_swings_until_complete() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    assert!(h.engine.start_channel("p1", ms(1000)).await);
    assert!(!h.engine.start_channel("p1", ms(1000)).await);
    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    assert_eq!(h.sessions.state("p1"), CombatState::Channeling);

    sleep(ms(500)).await;
    assert_eq!(h.stored_hp("m1"), Some(1000.0));
    assert_eq!(h.notifier.swings("p1"), 0);

    sleep(ms(800)).await;
    assert!(h
        .notifier
        .events()
        .contains(&CombatEvent::ChannelCompleted { actor_id: "p1".to_string() }));
    assert_eq!(h.sessions.state("p1"), CombatState::Engaged);
    assert_eq!(h.stored_hp("m1"), Some(970.0));
    h.engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_channel_never_completes() {
    let h = Harness::new();

    assert!(h.engine.start_channel("p1", ms(5000)).await);
    assert!(h.engine.interrupt_channel("p1"));
    assert!(!h.engine.interrupt_channel("p1"));
    assert_eq!(h.sessions.state("p1"), CombatState::Idle);
    assert!(!h.sessions.contains("p1"));

    sleep(ms(6000)).await;
    let events = h.notifier.events();
    assert!(events.contains(&CombatEvent::ChannelInterrupted { actor_id: "p1".to_string() }));
    assert!(!events.contains(&CombatEvent::ChannelCompleted { actor_id: "p1".to_string() }));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_loops() {
    let h = Harness::new();
    h.put_actor("m1", 1000.0, 1000.0).await;
    h.arm_attacker("p1", 30.0, 2.0, 50.0).await;
    h.arm_attacker("p2", 30.0, 2.0, 50.0).await;
    h.place("m1", 10.0, 0.0);

    h.engine.request_attack("p1", vec!["m1".to_string()]).await;
    h.engine.request_attack("p2", vec!["m1".to_string()]).await;
    assert_eq!(h.engine.in_combat_actors().len(), 2);

    h.engine.shutdown().await;
    assert!(h.engine.in_combat_actors().is_empty());
}
