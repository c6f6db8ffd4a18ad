pub mod agent;
pub mod checkpoint;
pub mod checksum;
pub mod init;
pub mod phase;
pub mod recover;
pub mod score;
pub mod snapshot;
pub mod status;
pub mod validate;
