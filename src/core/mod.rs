pub mod clock;
pub mod coordinator;
pub mod reshape;
pub mod run_state;
pub mod worker;
