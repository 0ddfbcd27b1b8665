use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 外部排程器觸發這條 pipeline 的週期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Schedule {
    #[serde(rename = "@once")]
    Once,
    #[serde(rename = "@hourly")]
    Hourly,
    #[default]
    #[serde(rename = "@daily")]
    Daily,
    #[serde(rename = "@weekly")]
    Weekly,
}

impl Schedule {
    /// 目前時間所屬排程區間的起點
    pub fn logical_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = now.date_naive().and_time(NaiveTime::default()).and_utc();
        match self {
            Schedule::Once => now,
            Schedule::Hourly => midnight + Duration::hours(i64::from(now.hour())),
            Schedule::Daily => midnight,
            Schedule::Weekly => {
                midnight - Duration::days(i64::from(now.weekday().num_days_from_sunday()))
            }
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Schedule::Once => "@once",
            Schedule::Hourly => "@hourly",
            Schedule::Daily => "@daily",
            Schedule::Weekly => "@weekly",
        };
        f.write_str(s)
    }
}

/// 單次 run 的明確上下文，建構 pipeline 時傳入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub pipeline: String,
    pub run_id: String,
    pub logical_date: DateTime<Utc>,
    pub schedule: Schedule,
    pub tags: Vec<String>,
}

impl RunContext {
    pub fn resolve(
        pipeline: &str,
        start_date: NaiveDate,
        schedule: Schedule,
        tags: &[String],
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if now.date_naive() < start_date {
            return Err(EtlError::ValidationError {
                message: format!(
                    "Run requested at {} is before run.start_date {}",
                    now.to_rfc3339(),
                    start_date
                ),
            });
        }

        let logical_date = schedule.logical_date(now);
        let run_id = match schedule {
            Schedule::Once => format!("manual__{}", logical_date.to_rfc3339()),
            _ => format!("scheduled__{}", logical_date.to_rfc3339()),
        };

        Ok(Self {
            pipeline: pipeline.to_string(),
            run_id,
            logical_date,
            schedule,
            tags: tags.to_vec(),
        })
    }

    /// 不受 start_date 限制的手動 run
    pub fn manual(pipeline: &str) -> Self {
        let now = Utc::now();
        Self {
            pipeline: pipeline.to_string(),
            run_id: format!("manual__{}", now.to_rfc3339()),
            logical_date: now,
            schedule: Schedule::Once,
            tags: Vec::new(),
        }
    }
}
