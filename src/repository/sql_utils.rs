// ==========================================
// 集装箱堆场作业规划系统 - 仓储层公共工具
// ==========================================
// 职责: 时间戳格式化/解析、布尔列转换
// 口径: 时间统一存储为 "%Y-%m-%d %H:%M:%S" (UTC)
// ==========================================

use chrono::NaiveDateTime;

/// 时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 格式化时间戳
pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// 解析时间戳列
///
/// # 参数
/// - `idx`: 列序号 (用于错误信息)
/// - `raw`: 列值
pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// 布尔 → 0/1
pub fn flag(v: bool) -> i32 {
    if v {
        1
    } else {
        0
    }
}
