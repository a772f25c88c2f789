pub mod dom;
pub mod links;
pub mod postprocess;
pub mod toc;

pub use postprocess::post_process;
