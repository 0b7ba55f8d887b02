//! 전투 서버
//!
//! 스탯 서비스, 전투 엔진, 리젠 스윕, 이벤트 브로드캐스트 루프를 묶어 실행합니다.
//! 전송 계층이 붙기 전까지는 플레이어 1명과 몹 1마리로 교전을 시연합니다.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use combatserver::attribute::ItemEffects;
use combatserver::config::StorageBackend;
use combatserver::service::{
    BroadcastNotifier, InMemoryStatsRepository, InMemoryWorld, RedisStatsRepository,
};
use combatserver::traits::{EquippedWeapon, StatsRepository};
use combatserver::{
    CombatEngine, CombatEvent, CombatServerConfig, DerivedStat, Position, RegenTicker,
    SessionRegistry, StatsService, TemplateKind, WeaponSlot,
};
use shared::config::RedisConfig;

/// 전투 서버 메인 구조체
pub struct CombatServer {
    config: CombatServerConfig,
    world: Arc<InMemoryWorld>,
    notifier: Arc<BroadcastNotifier>,
    stats: Arc<StatsService>,
    engine: Arc<CombatEngine>,
    shutdown: CancellationToken,
}

impl CombatServer {
    pub async fn new(config: CombatServerConfig) -> Result<Self> {
        info!("전투 서버 초기화 시작...");

        let repository: Arc<dyn StatsRepository> = match config.storage.backend {
            StorageBackend::Memory => {
                info!("인메모리 스탯 저장소 사용");
                Arc::new(InMemoryStatsRepository::new())
            }
            StorageBackend::Redis => {
                let redis_config = RedisConfig::new()
                    .await
                    .map_err(|e| anyhow::anyhow!("Redis 연결 실패: {}", e))?;
                info!(host = %redis_config.host, port = redis_config.port, "Redis 스탯 저장소 연결 완료");
                Arc::new(RedisStatsRepository::new(redis_config))
            }
        };

        let world = Arc::new(InMemoryWorld::new());
        let notifier = Arc::new(BroadcastNotifier::new(
            config.notification.channel_capacity,
        ));
        let sessions = Arc::new(SessionRegistry::new());

        let stats = Arc::new(StatsService::new(
            repository,
            notifier.clone(),
            world.clone(),
            sessions.clone(),
        ));

        let engine = Arc::new(CombatEngine::new(
            config.combat.clone(),
            sessions,
            stats.clone(),
            world.clone(),
            world.clone(),
            world.clone(),
            notifier.clone(),
        ));
        info!("전투 엔진 초기화 완료");

        Ok(Self {
            config,
            world,
            notifier,
            stats,
            engine,
            shutdown: CancellationToken::new(),
        })
    }

    /// 서버 실행
    ///
    /// 1. 이벤트 브로드캐스트 루프: 알림을 로깅하고 월드 스냅샷에 반영
    /// 2. 리젠 스윕 루프
    /// 3. 시연 교전
    pub async fn start(&self) -> Result<()> {
        let broadcast_handle = {
            let mut events = self.notifier.subscribe();
            let world = self.world.clone();
            let shutdown = self.shutdown.clone();

            tokio::spawn(async move {
                loop {
                    let event = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        event = events.recv() => event,
                    };
                    match event {
                        Ok(event) => Self::apply_event(&world, &event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "이벤트 수신 지연으로 일부 누락");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        };

        let regen_handle = {
            let ticker = RegenTicker::new(self.stats.clone());
            let interval = self.config.regen.interval();
            let shutdown = self.shutdown.clone();
            let world = self.world.clone();

            tokio::spawn(async move {
                ticker.run(interval, shutdown, move || world.known_actors()).await;
            })
        };

        if let Err(e) = self.spawn_demo_encounter().await {
            error!(error = %e, "시연 교전 준비 실패");
        }

        info!("전투 서버 실행 중 (Ctrl+C로 종료)");
        signal::ctrl_c().await?;
        info!("종료 신호 수신");

        self.engine.shutdown().await;
        self.shutdown.cancel();
        for handle in [broadcast_handle, regen_handle] {
            if let Err(e) = handle.await {
                error!(error = %e, "백그라운드 태스크 종료 실패");
            }
        }

        info!("전투 서버 종료 완료");
        Ok(())
    }

    fn apply_event(world: &InMemoryWorld, event: &CombatEvent) {
        match event {
            CombatEvent::StatsUpdated {
                actor_id,
                derived_stats,
            } => {
                world.merge_derived_stats(actor_id, derived_stats);
                info!(actor_id = %actor_id, diff = ?derived_stats, "스탯 변경");
            }
            CombatEvent::ActorsRemoved { actor_ids } => {
                for actor_id in actor_ids {
                    world.forget(actor_id);
                }
                info!(actors = ?actor_ids, "액터 제거");
            }
            other => info!(event = ?other, "전투 이벤트"),
        }
    }

    async fn spawn_demo_encounter(&self) -> Result<()> {
        let player = self
            .stats
            .initialize_actor("player-1", TemplateKind::Player, 1)
            .await?;
        let mob = self
            .stats
            .initialize_actor("mob-1", TemplateKind::Mob, 1)
            .await?;

        self.world
            .set_derived_stats(&player.actor_id, player.derived_stats.clone());
        self.world
            .set_derived_stats(&mob.actor_id, mob.derived_stats.clone());
        self.world
            .set_position(&player.actor_id, Position::new(0.0, 0.0));
        self.world
            .set_position(&mob.actor_id, Position::new(30.0, 40.0));

        self.world.equip(
            &player.actor_id,
            WeaponSlot::MainHand,
            EquippedWeapon {
                item_instance_id: "training-sword".to_string(),
                attack_range: Some(100.0),
                item_effects: ItemEffects::from([
                    (DerivedStat::WeaponDamage, 25.0),
                    (DerivedStat::WeaponAttackSpeed, 1.5),
                ]),
            },
        );

        self.engine
            .request_attack(&player.actor_id, vec![mob.actor_id.clone()])
            .await;
        info!(attacker = %player.actor_id, target = %mob.actor_id, "시연 교전 시작");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
                .add_directive("combatserver=debug".parse()?),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("전투 서버 v{} 시작", env!("CARGO_PKG_VERSION"));

    let config =
        CombatServerConfig::from_env().map_err(|e| anyhow::anyhow!("설정 로드 실패: {}", e))?;

    let server = CombatServer::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("서버 생성 실패: {}", e))?;

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("서버 실행 실패: {}", e))?;

    Ok(())
}
