pub mod agent;
pub mod session;
pub mod stdio;
pub mod tooling;
