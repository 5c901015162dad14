pub mod aggregate;
pub mod counter;
pub mod error;
pub mod fetch;
pub mod index;
pub mod output;
pub mod select;
pub mod source;
pub mod week;
