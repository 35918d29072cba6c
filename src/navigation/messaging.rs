//! Command/response types for the Navigator's actor channel.

use crate::types::InteractionStep;

#[derive(Debug)]
pub enum NavCommand {
    RunStep { index: usize, user_step_text: String },
    Stop,
}

#[derive(Debug)]
pub enum NavResponse {
    StepComplete(Box<InteractionStep>),
    Error(String),
    Stopped,
}
