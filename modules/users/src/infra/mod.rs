pub mod bus;
pub mod storage;
