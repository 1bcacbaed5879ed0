pub mod debounce;
pub mod store;

pub use debounce::SaveDebouncer;
pub use store::ProjectStore;
