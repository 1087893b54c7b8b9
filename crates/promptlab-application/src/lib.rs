pub mod session;

pub use session::PromptLabSession;
