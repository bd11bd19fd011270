// ==========================================
// 集装箱堆场作业规划系统 - 时钟抽象
// ==========================================
// 作业计划的 event_time 由注入的时钟提供,测试可固定时间
// ==========================================

use chrono::{NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// 系统时钟 (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// 固定时钟
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
