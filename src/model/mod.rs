pub mod attendance;
pub mod identity;
pub mod profile;
pub mod role;
pub mod task;
