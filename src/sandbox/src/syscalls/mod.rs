mod sys_capsicum;
mod sys_file;
mod sys_lseek;
mod sys_read;
mod sys_stat;
mod sys_write;

pub use sys_capsicum::*;
pub use sys_file::*;
pub use sys_lseek::*;
pub use sys_read::*;
pub use sys_stat::*;
pub use sys_write::*;

use utils::SysError;

pub type Result = std::result::Result<usize, SysError>;

#[cfg(test)]
pub(crate) mod test_utils {
    use capsicum::EnforcementMode;
    use fs::{file_test_utils::new_test_file, FdFlags};

    use crate::kernel::{fd_table::FdTable, task::Task};

    // task_with_test_file returns a task whose only descriptor refers to a
    // readable and writable test file.
    pub fn task_with_test_file(mode: EnforcementMode) -> (Task, i32) {
        let task = Task::new(FdTable::new(mode.gate(), 64));
        let fd = task
            .install_file(new_test_file(), FdFlags::default())
            .unwrap();
        (task, fd)
    }
}
