pub mod cancel;
pub mod captions;
pub mod export;
pub mod options;
pub mod render;
pub mod status;

pub use cancel::captions_cancel;
pub use captions::captions;
pub use export::captions_export;
pub use status::captions_status;
