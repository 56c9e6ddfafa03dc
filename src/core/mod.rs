pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod text;
pub mod view_model;
