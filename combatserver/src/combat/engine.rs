//! 전투 엔진
//!
//! 교전 중인 액터마다 하나의 반복 태스크(공격 루프)를 돌립니다.
//!
//! # 상태 전이
//! IDLE → ENGAGED (타겟이 있는 공격 요청) → 세션 제거 (중지 요청, 타겟 소진,
//! 공격자 사망/스탯 없음, 액터 제거). 채널링 중이면 채널링이 끝날 때 제거합니다.
//!
//! # 공격 루프
//! 1. 고정 주기(기본 100ms)마다 공격자 스탯이 살아있는지 확인
//! 2. 타겟 목록을 살아있는 스탯으로 해석
//! 3. 해석 결과가 비면 루프 종료 및 세션 제거
//! 4. 타겟마다 무기 슬롯별로 `try_attack` 시도
//!
//! 활성 태스크 레지스트리는 액터 ID를 키로 취소 토큰을 보관하므로
//! 중지 요청은 다음 틱을 기다리지 않고 즉시 반영됩니다.
//! 진행 중이던 타격 처리는 끝까지 완료됩니다.
//!
//! 세션이 제거돼도 슬롯별 마지막 공격 시각은 엔진이 보관했다가 다음 교전의
//! 세션에 되돌려 주므로, 중지 후 재요청으로 공격 간격을 건너뛸 수 없습니다.
//! 보관분은 액터가 제거될 때 함께 지워집니다.

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::damage::{attack_interval, calculate_damage_map};
use super::session::{CombatSessionData, CombatState, SessionRegistry};
use crate::attribute::{DerivedStat, Stats, StatsService};
use crate::config::CombatConfig;
use crate::messages::CombatEvent;
use crate::traits::{
    EquipmentProvider, EquippedWeapon, SessionContext, StatusProvider, UpdateNotifier,
};
use crate::types::{ActorId, WeaponSlot};
use shared::tool::error::AppError;

/// 한 번의 공격 시도 결과
#[derive(Debug, Clone, PartialEq)]
pub enum AttackResolution {
    /// 해당 슬롯에 장착된 무기 없음
    NoWeapon,
    /// 사거리 밖이거나 위치를 알 수 없음
    OutOfRange,
    /// 공격자 세션 컨텍스트(파생 스탯) 없음
    NoContext,
    /// 아직 공격 간격이 지나지 않음
    CoolingDown,
    /// 곧 공격 가능하여 스윙 신호만 전송
    Telegraphed,
    /// 데미지 적용
    Hit { damage: f64, lethal: bool },
    /// 타겟이 이미 사망했거나 삭제됨
    TargetGone,
    /// 저장소 오류로 처리하지 못함
    Failed,
}

struct ActiveTask {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct CombatEngine {
    config: CombatConfig,
    sessions: Arc<SessionRegistry>,
    stats: Arc<StatsService>,
    equipment: Arc<dyn EquipmentProvider>,
    status: Arc<dyn StatusProvider>,
    context: Arc<dyn SessionContext>,
    notifier: Arc<dyn UpdateNotifier>,
    /// 교전 중인 액터 집합 겸 활성 태스크 레지스트리
    active_tasks: DashMap<ActorId, ActiveTask>,
    /// 세션 없이 보관 중인 슬롯별 마지막 공격 시각
    cooldowns: DashMap<ActorId, HashMap<WeaponSlot, Instant>>,
    next_task_id: AtomicU64,
    rng: Mutex<StdRng>,
}

impl CombatEngine {
    pub fn new(
        config: CombatConfig,
        sessions: Arc<SessionRegistry>,
        stats: Arc<StatsService>,
        equipment: Arc<dyn EquipmentProvider>,
        status: Arc<dyn StatusProvider>,
        context: Arc<dyn SessionContext>,
        notifier: Arc<dyn UpdateNotifier>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            sessions,
            stats,
            equipment,
            status,
            context,
            notifier,
            active_tasks: DashMap::new(),
            cooldowns: DashMap::new(),
            next_task_id: AtomicU64::new(1),
            rng: Mutex::new(rng),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// 공격 루프가 돌고 있는지 여부
    pub fn is_in_combat(&self, actor_id: &str) -> bool {
        self.active_tasks.contains_key(actor_id)
    }

    pub fn in_combat_actors(&self) -> Vec<ActorId> {
        self.active_tasks.iter().map(|e| e.key().clone()).collect()
    }

    /// 공격 요청
    ///
    /// 타겟을 교체하고 루프가 없으면 시작합니다. 빈 타겟, 행동 불가 상태,
    /// 스탯이 없거나 죽은 공격자의 요청은 세션을 만들지 않고 무시됩니다.
    pub async fn request_attack(self: &Arc<Self>, actor_id: &str, targets: Vec<ActorId>) -> bool {
        if targets.is_empty() {
            debug!(actor_id = %actor_id, "Attack request without targets dropped");
            return false;
        }
        if !self.status.can_act(actor_id).await {
            debug!(actor_id = %actor_id, "Attack request dropped - actor cannot act");
            return false;
        }
        match self.stats.get_stats(actor_id).await {
            Ok(stats) if stats.is_alive() => {}
            Ok(_) => {
                debug!(actor_id = %actor_id, "Attack request dropped - attacker is dead");
                return false;
            }
            Err(e) => {
                e.log(&format!("attack request from {actor_id}"));
                return false;
            }
        }

        self.sessions.upsert(actor_id, |session| {
            session.targets = targets.into_iter().collect();
            if session.state == CombatState::Idle {
                session.state = CombatState::Engaged;
            }
            if session.last_attack.is_empty() {
                if let Some((_, carried)) = self.cooldowns.remove(actor_id) {
                    session.last_attack = carried;
                }
            }
            // 세션 가드를 쥔 채로 확인해야 종료 중인 루프와 엇갈리지 않습니다
            self.ensure_loop(actor_id);
        });

        true
    }

    /// 공격 중지 요청
    ///
    /// 루프를 즉시 취소하고 세션을 제거합니다. 채널링 중이면 타겟만 비우고
    /// 세션은 채널링이 끝날 때 제거됩니다.
    pub fn request_stop_attack(&self, actor_id: &str) {
        let task = self.sessions.settle(actor_id, |session| {
            let task = self.active_tasks.remove(actor_id).map(|(_, task)| task);
            let Some(session) = session else {
                return (false, task);
            };
            session.targets.clear();
            if session.state == CombatState::Channeling {
                return (false, task);
            }
            self.stash_cooldowns(actor_id, session);
            (true, task)
        });

        if let Some(task) = task {
            task.cancel.cancel();
            info!(actor_id = %actor_id, "Attack loop stopped by request");
        }
    }

    /// 사망/디스폰된 액터의 전투 상태 정리
    ///
    /// 자기 루프와 세션을 없애고 다른 모든 세션의 타겟에서 뺍니다.
    pub fn remove_actor(&self, actor_id: &str) {
        if let Some((_, task)) = self.active_tasks.remove(actor_id) {
            task.cancel.cancel();
        }
        self.sessions.remove(actor_id);
        self.cooldowns.remove(actor_id);
        self.sessions.remove_target_everywhere(actor_id);
        debug!(actor_id = %actor_id, "Combat state removed");
    }

    /// 모든 공격 루프 종료
    pub async fn shutdown(&self) {
        let ids: Vec<ActorId> = self.in_combat_actors();
        for id in ids {
            if let Some((_, task)) = self.active_tasks.remove(&id) {
                task.cancel.cancel();
                if let Err(e) = task.handle.await {
                    AppError::InternalError(format!("attack loop join for {id}: {e}"))
                        .log("combat engine shutdown");
                }
            }
        }
    }

    fn ensure_loop(self: &Arc<Self>, actor_id: &str) {
        if let dashmap::mapref::entry::Entry::Vacant(slot) =
            self.active_tasks.entry(actor_id.to_string())
        {
            let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            let engine = Arc::clone(self);
            let loop_cancel = cancel.clone();
            let loop_actor = actor_id.to_string();

            let handle = tokio::spawn(async move {
                engine.attack_loop(loop_actor, id, loop_cancel).await;
            });

            slot.insert(ActiveTask { id, cancel, handle });
            info!(actor_id = %actor_id, task_id = id, "Attack loop started");
        }
    }

    async fn attack_loop(self: Arc<Self>, actor_id: ActorId, task_id: u64, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if !self.run_tick(&actor_id, task_id).await {
                break;
            }
        }

        debug!(actor_id = %actor_id, task_id, "Attack loop exited");
    }

    /// 공격 루프 1틱. 계속 돌아야 하면 true
    async fn run_tick(&self, actor_id: &str, task_id: u64) -> bool {
        match self.stats.get_stats(actor_id).await {
            Ok(stats) if stats.is_alive() => {}
            Ok(_) => {
                self.leave_combat(actor_id, task_id, true);
                info!(actor_id = %actor_id, "Attacker is dead - leaving combat");
                return false;
            }
            Err(e) if e.is_not_found() => {
                self.leave_combat(actor_id, task_id, true);
                info!(actor_id = %actor_id, "Attacker has no stats - leaving combat");
                return false;
            }
            Err(e) => {
                e.log(&format!("resolve attacker {actor_id}"));
                return true;
            }
        }

        let Some(session) = self.sessions.snapshot(actor_id) else {
            self.leave_combat(actor_id, task_id, true);
            return false;
        };

        let mut live = Vec::with_capacity(session.targets.len());
        let mut gone = Vec::new();
        for target_id in &session.targets {
            match self.stats.get_stats(target_id).await {
                Ok(stats) if stats.is_alive() => live.push(stats),
                Ok(_) => gone.push(target_id.clone()),
                Err(e) if e.is_not_found() => gone.push(target_id.clone()),
                Err(e) => e.log(&format!("resolve target {target_id}")),
            }
        }

        if !gone.is_empty() {
            self.sessions.update(actor_id, |session| {
                for id in &gone {
                    session.targets.remove(id);
                }
            });
        }

        if self.leave_combat(actor_id, task_id, false) {
            info!(actor_id = %actor_id, "No live targets - leaving combat");
            return false;
        }

        if session.state == CombatState::Channeling {
            return true;
        }
        if !self.status.can_act(actor_id).await {
            return true;
        }

        let now = Instant::now();
        for target in &live {
            for slot in WeaponSlot::ALL {
                match self.try_attack(actor_id, target, slot, now).await {
                    AttackResolution::Hit { lethal: true, .. } | AttackResolution::TargetGone => {
                        break
                    }
                    _ => {}
                }
            }
        }

        true
    }

    /// 루프 종료 판단과 세션 정리
    ///
    /// `force`가 아니면 타겟이 남아있을 때 아무것도 하지 않습니다. 종료하면
    /// 이 루프의 태스크 항목을 지우고, 채널링 중이 아니면 세션도 제거합니다.
    /// 판단과 정리는 모두 세션 가드 안에서 끝납니다. 루프를 끝내야 하면 true.
    fn leave_combat(&self, actor_id: &str, task_id: u64, force: bool) -> bool {
        self.sessions.settle(actor_id, |session| {
            let Some(session) = session else {
                self.active_tasks.remove_if(actor_id, |_, t| t.id == task_id);
                return (false, true);
            };
            if !force && !session.targets.is_empty() {
                return (false, false);
            }

            self.active_tasks.remove_if(actor_id, |_, t| t.id == task_id);
            if force || session.state != CombatState::Channeling {
                self.stash_cooldowns(actor_id, session);
                (true, true)
            } else {
                (false, true)
            }
        })
    }

    /// 제거될 세션의 마지막 공격 시각을 다음 교전을 위해 보관
    fn stash_cooldowns(&self, actor_id: &str, session: &CombatSessionData) {
        if !session.last_attack.is_empty() {
            self.cooldowns
                .insert(actor_id.to_string(), session.last_attack.clone());
        }
    }

    fn swing_clock(&self, actor_id: &str, slot: WeaponSlot) -> (Option<Instant>, bool) {
        match self.sessions.snapshot(actor_id) {
            Some(session) => (session.last_attack(slot), session.swing_sent(slot)),
            None => (
                self.cooldowns
                    .get(actor_id)
                    .and_then(|c| c.get(&slot).copied()),
                false,
            ),
        }
    }

    fn record_attack(&self, actor_id: &str, slot: WeaponSlot, now: Instant) {
        let recorded = self.sessions.update(actor_id, |session| {
            session.last_attack.insert(slot, now);
            session.swing_sent.insert(slot, false);
        });
        if recorded.is_none() {
            self.cooldowns
                .entry(actor_id.to_string())
                .or_default()
                .insert(slot, now);
        }
    }

    /// 한 타겟에 대한 한 슬롯의 공격 시도
    ///
    /// 무기 → 사거리 → 공격 간격 순으로 검사합니다. 간격이 지났으면 데미지를
    /// 적용하고, 간격까지 스윙 선행 시간 이내로 남았으면 스윙 신호만 보냅니다.
    /// 스윙 신호는 공격 1회당 최대 한 번입니다.
    pub async fn try_attack(
        &self,
        attacker_id: &str,
        target: &Stats,
        slot: WeaponSlot,
        now: Instant,
    ) -> AttackResolution {
        let Some(weapon) = self.equipment.equipped_weapon(attacker_id, slot).await else {
            return AttackResolution::NoWeapon;
        };

        let range = weapon
            .attack_range
            .unwrap_or(self.config.default_attack_range);
        if !self.within_range(attacker_id, &target.actor_id, range).await {
            return AttackResolution::OutOfRange;
        }

        let Some(attacker_stats) = self.context.derived_stats(attacker_id).await else {
            return AttackResolution::NoContext;
        };

        let base_speed = weapon
            .item_effects
            .get(&DerivedStat::WeaponAttackSpeed)
            .copied()
            .filter(|speed| *speed > 0.0)
            .unwrap_or(self.config.default_weapon_speed_secs);
        let speed_stat = attacker_stats
            .get(&DerivedStat::AttackSpeed)
            .copied()
            .unwrap_or(0.0);
        let interval = attack_interval(base_speed, speed_stat);

        let (last_attack, swing_sent) = self.swing_clock(attacker_id, slot);

        let next_allowed = last_attack.map(|last| last.checked_add(interval));
        let ready = match next_allowed {
            None => true,
            Some(Some(next)) => now >= next,
            Some(None) => false,
        };

        if ready {
            if !swing_sent {
                self.send_swing(attacker_id, &weapon, slot);
            }

            let damage = {
                let mut rng = self.rng.lock();
                calculate_damage_map(
                    &weapon,
                    &attacker_stats,
                    self.config.damage_variance,
                    &mut *rng,
                )
            };
            let total: f64 = damage.values().sum();

            self.record_attack(attacker_id, slot, now);

            return match self.stats.apply_damage_to(&target.actor_id, &damage).await {
                Ok(outcome) if outcome.diff.is_empty() && !outcome.stats.is_alive() => {
                    AttackResolution::TargetGone
                }
                Ok(outcome) => {
                    if outcome.lethal {
                        self.handle_death(attacker_id, &target.actor_id).await;
                    }
                    AttackResolution::Hit {
                        damage: total,
                        lethal: outcome.lethal,
                    }
                }
                Err(e) if e.is_not_found() => AttackResolution::TargetGone,
                Err(e) => {
                    e.log(&format!("apply damage to {}", target.actor_id));
                    AttackResolution::Failed
                }
            };
        }

        let lead_reached = match next_allowed.flatten() {
            Some(next) => now
                .checked_add(self.config.swing_lead())
                .map_or(true, |lead_at| lead_at >= next),
            None => false,
        };
        if lead_reached && !swing_sent {
            self.send_swing(attacker_id, &weapon, slot);
            self.sessions.update(attacker_id, |session| {
                session.swing_sent.insert(slot, true);
            });
            return AttackResolution::Telegraphed;
        }

        AttackResolution::CoolingDown
    }

    async fn within_range(&self, attacker_id: &str, target_id: &str, range: f64) -> bool {
        let (Some(attacker), Some(target)) = (
            self.context.position(attacker_id).await,
            self.context.position(target_id).await,
        ) else {
            return false;
        };
        attacker.distance_to(&target) <= range
    }

    fn send_swing(&self, attacker_id: &str, weapon: &EquippedWeapon, slot: WeaponSlot) {
        self.publish(CombatEvent::SwingTelegraph {
            actor_id: attacker_id.to_string(),
            item_instance_id: weapon.item_instance_id.clone(),
            slot,
        });
    }

    /// 사망 처리
    ///
    /// 치명타를 낸 처리 안에서 동기적으로 스탯 삭제, 제거 알림,
    /// 공격자 타겟 정리를 수행합니다.
    async fn handle_death(&self, attacker_id: &str, target_id: &str) {
        info!(attacker = %attacker_id, target = %target_id, "Actor died");

        if let Err(e) = self.stats.delete_stats(target_id).await {
            e.log("delete stats on death");
        }

        self.publish(CombatEvent::ActorsRemoved {
            actor_ids: vec![target_id.to_string()],
        });

        self.sessions.update(attacker_id, |session| {
            session.targets.remove(target_id);
        });
        self.remove_actor(target_id);
    }

    /// 채널링 시작
    ///
    /// 채널링 중에는 평타 스윙을 하지 않습니다. `cast_time`이 지난 뒤에도
    /// 채널링 상태면 완료 이벤트를 보냅니다. 타겟이 남아있으면 교전 상태로
    /// 돌아가고, 없으면 세션을 제거합니다.
    pub async fn start_channel(self: &Arc<Self>, actor_id: &str, cast_time: Duration) -> bool {
        if !self.status.can_act(actor_id).await {
            return false;
        }

        let started_at = Instant::now();
        let started = self.sessions.upsert(actor_id, |session| {
            if session.state == CombatState::Channeling {
                return false;
            }
            session.state = CombatState::Channeling;
            session.channel_started_at = Some(started_at);
            true
        });
        if !started {
            return false;
        }

        self.publish(CombatEvent::ChannelStarted {
            actor_id: actor_id.to_string(),
        });

        let engine = Arc::clone(self);
        let actor = actor_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(cast_time).await;
            let completed = engine.sessions.settle(&actor, |session| match session {
                Some(session)
                    if session.state == CombatState::Channeling
                        && session.channel_started_at == Some(started_at) =>
                {
                    (engine.end_channel(&actor, session), true)
                }
                _ => (false, false),
            });

            if completed {
                engine.publish(CombatEvent::ChannelCompleted { actor_id: actor });
            }
        });

        true
    }

    /// 채널링 중단
    pub fn interrupt_channel(&self, actor_id: &str) -> bool {
        let interrupted = self.sessions.settle(actor_id, |session| match session {
            Some(session) if session.state == CombatState::Channeling => {
                (self.end_channel(actor_id, session), true)
            }
            _ => (false, false),
        });

        if interrupted {
            self.publish(CombatEvent::ChannelInterrupted {
                actor_id: actor_id.to_string(),
            });
        }
        interrupted
    }

    /// 채널링 종료 후 상태 복귀. 타겟이 없으면 세션을 제거해야 하므로 true
    fn end_channel(&self, actor_id: &str, session: &mut CombatSessionData) -> bool {
        session.channel_started_at = None;
        if session.targets.is_empty() {
            self.stash_cooldowns(actor_id, session);
            return true;
        }
        session.state = CombatState::Engaged;
        false
    }

    fn publish(&self, event: CombatEvent) {
        if let Err(e) = self.notifier.publish(event) {
            warn!(error = %e, "Combat event dropped");
        }
    }
}
