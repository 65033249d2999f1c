//! Physical buttons.
//!
//! Five tactile switches (active-low with internal pull-up), each mapped
//! to one bit of the key state the application task receives.

pub mod buttons;
