//! Translates host gamepad, mouse and keyboard state into the input devices
//! of an emulated computer: digital and analog joysticks, mice and a keyboard
//! with an on-screen virtual keyboard.

pub mod config;
pub mod controller;
pub mod mapping;
