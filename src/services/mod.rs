pub mod captcha;
pub use captcha::{CaptchaGate, CheckpointError, PendingCheckpoint};

pub mod fetcher;
pub use fetcher::{CaseFetcher, CourtFetcher, FetchError, FetchTimings};
