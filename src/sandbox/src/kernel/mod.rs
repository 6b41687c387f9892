pub mod fd_table;
pub mod task;
