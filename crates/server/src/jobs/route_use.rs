use chrono::{DateTime, Duration, NaiveDate, Utc};

use tembea_core::domain::ids::{BatchUseRecordId, RouteBatchId};
use tembea_core::domain::usage::{AttendStatus, NewBatchUseRecord};
use tembea_core::errors::ServiceError;
use tembea_core::RouteBatch;

use super::{capture, JobContext};

/// The daily cycle of a route batch: a reminder before take-off, then attendance
/// records and a "did you take the trip?" prompt once the batch has left.
///
/// Both jobs re-register themselves for the following day while the batch stays active.
#[derive(Clone)]
pub struct ConfirmRouteUseJob {
    ctx: JobContext,
}

pub fn reminder_job_name(batch_id: RouteBatchId) -> String {
    format!("route-reminder-{}", batch_id.0)
}

pub fn batch_start_job_name(batch_id: RouteBatchId) -> String {
    format!("route-batch-start-{}", batch_id.0)
}

pub fn recheck_job_name(record_id: BatchUseRecordId) -> String {
    format!("route-use-recheck-{}", record_id.0)
}

impl ConfirmRouteUseJob {
    pub fn new(ctx: JobContext) -> Self {
        Self { ctx }
    }

    fn reminder_lead(&self) -> Duration {
        Duration::minutes(self.ctx.settings.reminder_lead_minutes)
    }

    fn confirmation_delay(&self) -> Duration {
        Duration::minutes(self.ctx.settings.route_confirmation_delay_minutes)
    }

    pub fn schedule_take_off_reminders(&self, batch: &RouteBatch) -> DateTime<Utc> {
        self.schedule_reminder_after(batch, Utc::now())
    }

    fn schedule_reminder_after(&self, batch: &RouteBatch, now: DateTime<Utc>) -> DateTime<Utc> {
        let lead = self.reminder_lead();
        let fire_at = batch.next_take_off_after(now + lead) - lead;
        let job = self.clone();
        let batch_id = batch.id;
        self.ctx.scheduler.schedule_at(reminder_job_name(batch_id), fire_at, move || async move {
            capture("route_take_off_reminder", job.remind_riders(batch_id).await.map(|_| ()));
        });
        fire_at
    }

    pub fn schedule_batch_start_job(&self, batch: &RouteBatch) -> DateTime<Utc> {
        self.schedule_start_after(batch, Utc::now())
    }

    fn schedule_start_after(&self, batch: &RouteBatch, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = self.confirmation_delay();
        let take_off = batch.next_take_off_after(now - delay);
        let fire_at = take_off + delay;
        let job = self.clone();
        let batch_id = batch.id;
        let batch_date = take_off.date_naive();
        self.ctx.scheduler.schedule_at(batch_start_job_name(batch_id), fire_at, move || async move {
            capture("route_batch_start", job.start_batch(batch_id, batch_date).await.map(|_| ()));
        });
        fire_at
    }

    /// Drops both jobs of a batch, e.g. when it is deactivated.
    pub fn cancel(&self, batch_id: RouteBatchId) {
        self.ctx.scheduler.cancel(&reminder_job_name(batch_id));
        self.ctx.scheduler.cancel(&batch_start_job_name(batch_id));
    }

    /// Reminds every rider of an active batch and queues tomorrow's reminder.
    /// Returns how many reminders went out.
    pub async fn remind_riders(&self, batch_id: RouteBatchId) -> Result<usize, ServiceError> {
        let Some(batch) = self.active_batch(batch_id).await? else {
            return Ok(0);
        };
        let riders = self.ctx.repos.users.list_by_route_batch(batch_id).await?;
        let details = self.ctx.repos.batch_details(batch.clone()).await?;

        let mut sent = 0;
        for rider in &riders {
            if self.ctx.notifier.send_take_off_reminder(rider, &details).await.is_sent() {
                sent += 1;
            }
        }
        self.schedule_reminder_after(&batch, Utc::now() + Duration::minutes(1));
        Ok(sent)
    }

    /// Opens a pending attendance record per rider and asks each to confirm the trip.
    /// Returns how many riders were asked.
    pub async fn start_batch(
        &self,
        batch_id: RouteBatchId,
        batch_date: NaiveDate,
    ) -> Result<usize, ServiceError> {
        let Some(batch) = self.active_batch(batch_id).await? else {
            return Ok(0);
        };
        let riders = self.ctx.repos.users.list_by_route_batch(batch_id).await?;
        let details = self.ctx.repos.batch_details(batch.clone()).await?;

        let mut asked = 0;
        for rider in &riders {
            let record = self
                .ctx
                .repos
                .batch_use
                .record(
                    NewBatchUseRecord { user_id: rider.id, batch_id, batch_date },
                    AttendStatus::Pending,
                )
                .await?;
            let delivery = self
                .ctx
                .notifier
                .send_route_use_confirmation(rider, &details, record.id)
                .await;
            if delivery.is_sent() {
                asked += 1;
            }
        }
        self.schedule_start_after(&batch, Utc::now() + Duration::minutes(1));
        Ok(asked)
    }

    /// A rider still on the trip is asked again once the confirmation delay passes.
    pub fn schedule_recheck(&self, record_id: BatchUseRecordId) -> DateTime<Utc> {
        let fire_at = Utc::now() + self.confirmation_delay();
        let job = self.clone();
        self.ctx.scheduler.schedule_at(recheck_job_name(record_id), fire_at, move || async move {
            capture("route_use_recheck", job.ask_again(record_id).await.map(|_| ()));
        });
        fire_at
    }

    /// Re-sends the prompt while the answer is still pending.
    pub async fn ask_again(&self, record_id: BatchUseRecordId) -> Result<bool, ServiceError> {
        let Some(record) = self.ctx.repos.batch_use.find_by_id(record_id).await? else {
            return Ok(false);
        };
        if record.user_attend_status != AttendStatus::Pending {
            return Ok(false);
        }
        let Some(batch) = self.ctx.repos.routes.find_batch(record.batch_id).await? else {
            return Ok(false);
        };
        let rider = self.ctx.repos.user(record.user_id).await?;
        let details = self.ctx.repos.batch_details(batch).await?;
        let delivery = self
            .ctx
            .notifier
            .send_route_use_confirmation(&rider, &details, record.id)
            .await;
        Ok(delivery.is_sent())
    }

    async fn active_batch(
        &self,
        batch_id: RouteBatchId,
    ) -> Result<Option<RouteBatch>, ServiceError> {
        let batch = self.ctx.repos.routes.find_batch(batch_id).await?;
        Ok(batch.filter(|batch| batch.status.is_active()))
    }
}
