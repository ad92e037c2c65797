pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

pub(crate) const DB_NAME: &str = "facilitator.db";
