pub mod helpers;
pub mod jobs;
