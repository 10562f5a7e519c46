pub mod loading_bar;
pub mod search_input;
