#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod error;
pub mod paths;
pub mod traits;
pub mod types;
