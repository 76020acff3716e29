mod catalog;
mod filter_box;
mod form;
mod layout;
mod notifications;
mod output;
mod status_bar;
pub mod theme;

pub use layout::draw;
