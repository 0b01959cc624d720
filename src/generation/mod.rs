//! Recipe generation: text model, image model, image upload.

pub mod dto;
pub mod gemini;
pub mod prompts;
pub mod services;
