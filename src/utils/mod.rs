mod perf;
mod spawn;
mod time_utils;

pub use spawn::spawn_detached;
pub use time_utils::{
    AppInstant, MS_IN_D, MS_IN_H, MS_IN_MIN, MS_IN_S, epoch_ms_to_utc, format_duration,
    now_timestamp_ms, now_utc,
};
