pub mod outcome;
pub mod scan_result;
pub mod size;
pub mod source;
pub mod summary;
