mod attach;

pub use attach::{find_jvm_by_name, ProcessInfo};
