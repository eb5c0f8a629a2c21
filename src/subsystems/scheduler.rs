use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use backon::{ExponentialBuilder, Retryable};
use bon::Builder;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio_graceful_shutdown::errors::CancelledByShutdown;
use tokio_graceful_shutdown::{FutureExt, SubsystemHandle};
use tracing::{error, info, warn};

use crate::services::digests::DigestService;
use crate::services::settings::{DEFAULT_CRON, DEFAULT_TIMEZONE, ScheduleConfig};

const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 3;

/// Подсистема ежедневной генерации дайджестов
#[derive(Builder)]
pub struct SchedulerSubsystem {
    service: DigestService,
    schedule: Schedule,
    timezone: Tz,
    #[builder(default = DEFAULT_MAX_RETRY_ATTEMPTS)]
    max_retry_attempts: usize,
    #[builder(default = Duration::from_secs(1))]
    min_retry_delay: Duration,
}

/// Разбирает cron-выражение и часовой пояс из конфигурации
pub fn parse_schedule(cfg: Option<&ScheduleConfig>) -> Result<(Schedule, Tz)> {
    let expr = cfg.and_then(|c| c.cron.as_deref()).unwrap_or(DEFAULT_CRON);
    let tz_name = cfg.and_then(|c| c.timezone.as_deref()).unwrap_or(DEFAULT_TIMEZONE);
    let schedule = Schedule::from_str(expr).with_context(|| format!("invalid cron expression {:?}", expr))?;
    let tz = Tz::from_str(tz_name).map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {}", tz_name, e))?;
    Ok((schedule, tz))
}

/// Ближайшее срабатывание расписания строго после `now`
pub fn next_fire(schedule: &Schedule, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
    schedule.after(&now.with_timezone(&tz)).next()
}

impl SchedulerSubsystem {
    pub fn from_config(cfg: Option<&ScheduleConfig>, service: DigestService) -> Result<Self> {
        let (schedule, timezone) = parse_schedule(cfg)?;
        Ok(Self::builder()
            .service(service)
            .schedule(schedule)
            .timezone(timezone)
            .max_retry_attempts(
                cfg.and_then(|c| c.max_retry_attempts)
                    .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
            )
            .build())
    }

    pub async fn run(self, subsys: SubsystemHandle) -> std::io::Result<()> {
        info!(timezone = %self.timezone, "Starting scheduler subsystem");

        let fut = async {
            match self.service.ensure_initial_digests().await {
                Ok(created) if !created.is_empty() => info!(count = created.len(), "scheduler: initial digests created"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "scheduler: initial digests failed"),
            }

            loop {
                let Some(next) = next_fire(&self.schedule, self.timezone, Utc::now()) else {
                    warn!("scheduler: schedule has no upcoming runs, stopping");
                    break;
                };
                let wait = (next.with_timezone(&Utc) - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                info!(next = %next, wait_secs = wait.as_secs(), "scheduler: waiting for next run");
                tokio::time::sleep(wait).await;

                let created = self.run_once().await;
                info!(created, "scheduler: run finished");
            }

            Ok::<(), std::io::Error>(())
        };

        match fut.cancel_on_shutdown(&subsys).await {
            Ok(Ok(())) => info!("Scheduler subsystem finished"),
            Ok(Err(e)) => return Err(e),
            Err(CancelledByShutdown) => info!("Scheduler subsystem cancelled by shutdown"),
        }

        Ok(())
    }

    /// Один проход по всем лентам; ошибки логируются, возвращает число созданных
    pub async fn run_once(&self) -> usize {
        let mut created = 0;
        for name in self.service.feeds() {
            let create = || async { self.service.create_digest(name).await };

            // zero attempts means a single try
            let builder = ExponentialBuilder::default()
                .with_min_delay(self.min_retry_delay)
                .with_max_times(self.max_retry_attempts);

            let result = create
                .retry(builder)
                .sleep(tokio::time::sleep)
                .notify(|err: &anyhow::Error, dur: Duration| {
                    warn!(feed = %name, error = %err, retry_in_ms = dur.as_millis() as u64, "scheduler: digest failed, retrying");
                })
                .await;

            match result {
                Ok(digest) => {
                    created += 1;
                    info!(feed = %name, id = %digest.id, "scheduler: digest ready");
                }
                Err(e) => error!(feed = %name, error = %e, "scheduler: digest failed after retries"),
            }
        }
        created
    }
}
