mod library;

pub use library::JsonLibrary;
pub use library::LibrarySnapshot;
