//! Device driver for UiPilot.
//!
//! This crate drives a real Android device through an Appium
//! UiAutomator2 server, speaking the W3C WebDriver wire protocol plus
//! the Appium vendor endpoints the turn loop needs.

mod capabilities;
mod uiautomator;

pub use capabilities::Capabilities;
pub use uiautomator::{UiAutomator2Config, UiAutomator2Driver};
