//! Browser-side automation of the viewer's web client

pub mod actions;
pub mod controls;
pub mod driver;
pub mod locator;
pub mod webdriver;

pub use actions::UiActions;
pub use controls::{Control, ControlMap};
pub use driver::{ElementHandle, UiDriver};
pub use locator::Locator;
pub use webdriver::WebDriverSession;
