pub mod candidate;
pub mod job;
pub mod match_record;
pub mod match_status;
pub mod timeline;
