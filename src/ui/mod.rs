//! UI building blocks shared by the main window.

pub mod dialogs;
pub mod theme;
