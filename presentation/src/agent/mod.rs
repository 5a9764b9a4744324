//! Agent event presentation

mod renderer;

pub use renderer::EventRenderer;
