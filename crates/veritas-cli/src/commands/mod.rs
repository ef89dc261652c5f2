pub mod init;
pub mod policies;
pub mod presentation;
pub mod status;
pub mod verify;
