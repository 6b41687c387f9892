// ioctl(2) requests understood by every file regardless of its type.
pub const FIONCLEX: u64 = 0x5450;
pub const FIOCLEX: u64 = 0x5451;
pub const FIONBIO: u64 = 0x5421;
pub const FIONREAD: u64 = 0x541B;

// is_fd_table_ioctl reports whether the request only touches the descriptor
// table slot and never reaches the file.
pub fn is_fd_table_ioctl(request: u64) -> bool {
    request == FIOCLEX || request == FIONCLEX
}
