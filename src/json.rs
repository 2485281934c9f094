pub mod patch;
pub mod pointer;
