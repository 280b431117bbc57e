/// Image command handlers and views
pub mod image;
