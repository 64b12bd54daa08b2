use crate::ai::{Brain, ChatMessage};
use crate::novel::types::PlotType;
use crate::types::Result;

pub async fn determine_plot_type(brain: &Brain, description: &str) -> Result<PlotType> {
    let messages = [
        ChatMessage::system(
            "You are a literary analyst specializing in Christopher Booker's Seven Basic Plots.",
        ),
        ChatMessage::user(format!(
            "Analyze this story description and determine which of the 7 basic plots \
             it best fits:\n\n{}",
            description
        )),
    ];

    brain.chat_structured(&messages).await
}
