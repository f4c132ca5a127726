// Library for the binary and for tests

pub mod agent;
pub mod audit_repo;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod rollout;
pub mod session;
pub mod storage;
pub mod units;
pub mod validator;
pub mod version;
