pub mod clock;
pub mod export;
