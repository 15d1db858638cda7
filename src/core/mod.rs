//! Core types: job records, crontab line parsing, dispatcher detection and
//! schedule computation. Nothing in here touches the filesystem.

pub mod dispatch;
pub mod job;
pub mod parser;
pub mod schedule;
