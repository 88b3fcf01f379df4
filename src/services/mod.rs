pub mod candidate_service;
pub mod job_service;
pub mod match_service;
pub mod notification_service;
pub mod side_effects;
