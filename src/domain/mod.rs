pub mod credits;
pub mod error;
pub mod status;
pub mod subscription;
