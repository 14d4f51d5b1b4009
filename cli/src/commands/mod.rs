pub mod run;
pub mod select;
pub mod work_queue;
